//! Cgroup Labels: resolves numeric identifiers from kernel event data into
//! human readable metric labels.
//!
//! Two decoders are provided: cgroup ids become cgroup directory paths, and
//! process ids become the id of the docker container running the process.
use std::io::BufRead;

use decoder::DecoderConfig;

pub mod cgroup;
pub mod config;
pub mod container;
pub mod decoder;
pub mod error;

// /proc/<pid>/cgroup line format: <hierarchy-id>:<controller-list>:<cgroup-path>
//  <hierarchy-id>:
//      v1: arbitrary number
//      v2: always '0'
//  <controller-list>:
//      v1: comma-separated list of controllers, e.g., cpu,memory
//      v2: always empty, i.e., ''
//  <cgroup-path>:
//      path relative to the cgroup root, `/docker/<id>` for docker (cgroupfs driver)
//
// cgroup id: on cgroup v2 the kernel uses the kernfs node id, which is both the
// inode number and the 8 byte `name_to_handle_at` handle of the directory.

/// Parses the decoder chain argument.
///
/// Accepts either comma separated decoder names (`cgroup,docker_container_id_from_pid`)
/// or a JSON array of [`DecoderConfig`] objects.
///
/// # Errors
///
/// Returns a JSON error if the argument looks like JSON but does not parse.
pub fn parse_decoder_chain(arg: &str) -> Result<Vec<DecoderConfig>, serde_json::Error> {
    let arg = arg.trim();
    if arg.starts_with('[') {
        return serde_json::from_str(arg);
    }

    Ok(arg
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(DecoderConfig::named)
        .collect())
}

/// Runs the Cgroup Labels command line tool.
///
/// Usage: `cgroup-labels <decoder>[,<decoder>...] [<value>...]`. Values are read
/// from standard input, one per line, if none are given. Each decoded label is
/// printed on its own line.
///
/// # Errors
///
/// Returns an error if the configuration or the decoder chain is invalid, or if
/// any value failed to decode. Failed values are logged and skipped.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let chain = args
        .next()
        .ok_or("usage: cgroup-labels <decoder>[,<decoder>...] [<value>...]")?;
    let chain = parse_decoder_chain(&chain)?;
    if chain.is_empty() {
        return Err("decoder chain must name at least one decoder".into());
    }

    let config = config::Config::from_env()?;
    log::debug!("Config: {:?}", config);
    let mut decoders = config.decoder_set();
    for link in &chain {
        if !decoders.contains(&link.name) {
            return Err(decoder::Error::UnknownDecoder(link.name.clone()).into());
        }
    }

    let mut values: Vec<String> = args.collect();
    if values.is_empty() {
        for line in std::io::stdin().lock().lines() {
            values.push(line?);
        }
    }

    let mut failed = 0usize;
    for value in values.iter().filter(|v| !v.trim().is_empty()) {
        match decoders.decode_chain(value.as_bytes(), &chain) {
            Ok(label) => println!("{}", String::from_utf8_lossy(&label)),
            Err(err) => {
                log::error!("failed to decode `{}`: {}", value, err);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(format!("{failed} value(s) failed to decode").into());
    }
    Ok(())
}
