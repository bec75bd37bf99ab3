use std::process::ExitCode;

fn main() -> ExitCode {
    backchannel_cli::run()
}
