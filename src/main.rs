use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tracing::error;

use phrasegroup::utils::{setup_logging, validate_args};
use phrasegroup::{analyze_keywords, init_default_palette, print_analysis_results, Args};

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);

    validate_args(&args)?;

    if args.init {
        return init_default_palette(Path::new("."));
    }

    let Some(input) = args.input.as_deref() else {
        anyhow::bail!("an input CSV file is required");
    };

    match analyze_keywords(input, &args) {
        Ok(result) => {
            print_analysis_results(&result, &args);
            Ok(())
        }
        Err(e) => {
            error!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
