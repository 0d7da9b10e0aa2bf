use super::args::*;

pub mod generate;
pub mod infer;
pub mod init;
pub mod schema;

pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const GENERATION_FAILED: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
    pub const INFRA_ERROR: i32 = 3;
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Generate(args) => generate::run(args).await,
        Command::Infer(args) => infer::run(args).await,
        Command::Schema(args) => schema::run(args),
        Command::Init(args) => init::run(args),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(exit_codes::OK)
        }
    }
}

/// Maps the first core error in the chain onto an exit code. Anything that
/// is not a core error (bad input files, I/O in the CLI itself) counts as
/// configuration.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    let core = err
        .chain()
        .find_map(|e| e.downcast_ref::<sudosql_core::Error>());
    match core {
        Some(e) if e.is_generation() => exit_codes::GENERATION_FAILED,
        Some(e) if e.is_infrastructure() => exit_codes::INFRA_ERROR,
        _ => exit_codes::CONFIG_ERROR,
    }
}
