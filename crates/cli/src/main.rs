use std::process::ExitCode;

fn main() -> ExitCode {
    prosper_cli::run()
}
