use std::process::ExitCode;

fn main() -> ExitCode {
    cascata_cli::run()
}
