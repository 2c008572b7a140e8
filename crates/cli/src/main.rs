use std::process::ExitCode;

fn main() -> ExitCode {
    scoopy_cli::run()
}
