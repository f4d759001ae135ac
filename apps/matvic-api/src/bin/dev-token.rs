//! # Development Token
//!
//! Prints a bearer token signed with `MATVIC_JWT_SECRET` (or the development
//! secret), for calling the mutating routes locally.
//!
//! ## Usage
//! ```bash
//! # Employee 1 at store 1, valid for one shift
//! cargo run -p matvic-api --bin dev-token
//!
//! # Employee 3, store 2, one hour
//! cargo run -p matvic-api --bin dev-token -- --employee 3 --store 2 --ttl 3600
//! ```

use std::env;

use anyhow::{bail, Context};
use matvic_api::{ApiConfig, JwtManager};

fn main() -> anyhow::Result<()> {
    let config = ApiConfig::load()?;

    let mut employee_id: i64 = 1;
    let mut store_id: Option<i64> = Some(1);
    let mut ttl = config.jwt_lifetime_secs;

    let args: Vec<String> = env::args().skip(1).collect();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--employee" | "-e" => {
                let value = iter.next().context("--employee needs a value")?;
                employee_id = value.parse().context("--employee must be an integer")?;
            }
            "--store" | "-s" => {
                let value = iter.next().context("--store needs a value")?;
                store_id = match value.as_str() {
                    "none" => None,
                    v => Some(v.parse().context("--store must be an integer or 'none'")?),
                };
            }
            "--ttl" | "-t" => {
                let value = iter.next().context("--ttl needs a value")?;
                ttl = value.parse().context("--ttl must be seconds")?;
            }
            "--help" | "-h" => {
                println!("Usage: dev-token [--employee ID] [--store ID|none] [--ttl SECONDS]");
                return Ok(());
            }
            other => bail!("unknown argument: {other}"),
        }
    }

    if config.uses_dev_secret() {
        eprintln!("⚠ signing with the development secret");
    }

    let token = JwtManager::new(&config.jwt_secret).generate(employee_id, store_id, ttl)?;
    println!("{token}");
    Ok(())
}
