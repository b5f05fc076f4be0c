use time::macros::format_description;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` wins over the verbosity flag.
pub fn setup_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(LocalTime::new(format_description!(
            "[hour]:[minute]:[second].[subsecond digits:3]"
        )))
        .with_target(false)
        .try_init();
}

pub fn format_number(num: usize) -> String {
    let digits = num.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn validate_args(args: &crate::args::Args) -> anyhow::Result<()> {
    if let Some(top) = args.top {
        if top == 0 {
            anyhow::bail!("--top must be greater than 0");
        }
    }

    if let Some(workers) = args.workers {
        if workers == 0 {
            anyhow::bail!("--workers must be greater than 0");
        }
    }

    if let Some(input) = &args.input {
        if input == &args.output {
            anyhow::bail!("--output must not overwrite the input file");
        }
    }

    Ok(())
}
