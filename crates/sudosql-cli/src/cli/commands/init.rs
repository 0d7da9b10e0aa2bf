use super::exit_codes;
use crate::cli::args::InitArgs;
use sudosql_core::config::write_sample_configs;

pub fn run(args: InitArgs) -> anyhow::Result<i32> {
    std::fs::create_dir_all(&args.dir)?;
    for (path, created) in write_sample_configs(&args.dir)? {
        if created {
            eprintln!("created {}", path.display());
        } else {
            eprintln!("note: {} already exists (skipped)", path.display());
        }
    }
    Ok(exit_codes::OK)
}
