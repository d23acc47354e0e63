// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use chrono::NaiveDateTime;
use clap::Parser;
use iasavr::avr::{self, AvrBundle};
use std::error::Error;
use std::fs;

#[derive(Parser)]
enum IasAvrCli {
    Open(OpenArgs),
    Inspect(InspectArgs),
}

#[derive(Debug, clap::Args)]
#[command(author, version, long_about = None,
    about = "Verify the supplied AVR bundle against the trust root pool and \
    print the decoded report")]
struct OpenArgs {
    #[arg(short, long, default_value = "avr-bundle.cbor")]
    bundle: String,

    #[arg(short, long, default_value = "roots.pem")]
    trustroots: String,

    /// Reference time anchoring the certificate validity window, in the
    /// report timestamp format (e.g. 2020-01-01T00:00:00)
    #[arg(short = 'T', long)]
    time: String,

    /// Skip signature and certificate chain verification for the remainder
    /// of the process (debug use only)
    #[arg(long, default_value_t = false)]
    unsafe_skip_verify: bool,
}

#[derive(Debug, clap::Args)]
#[command(author, version, long_about = None,
    about = "Print the component sizes of the supplied AVR bundle without \
    verifying it")]
struct InspectArgs {
    #[arg(short, long, default_value = "avr-bundle.cbor")]
    bundle: String,
}

fn main() {
    match IasAvrCli::parse() {
        IasAvrCli::Open(args) => match open(&args) {
            Ok(j) => println!("{j}"),
            Err(e) => eprintln!("open failed: {e}"),
        },

        IasAvrCli::Inspect(args) => match inspect(&args) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("inspect failed: {e}"),
        },
    }
}

fn open(args: &OpenArgs) -> Result<String, Box<dyn Error>> {
    if args.unsafe_skip_verify {
        avr::unsafe_skip_verify();
    }

    let raw = fs::read(&args.bundle)?;
    let bundle = AvrBundle::from_cbor(&raw)?;

    let pem = fs::read(&args.trustroots)?;
    let roots = avr::trust_roots_from_pem(&pem)?;

    let ts = NaiveDateTime::parse_from_str(&args.time, avr::TIMESTAMP_FORMAT)?.and_utc();

    let report = bundle.open(&roots, ts)?;

    let j = serde_json::to_string_pretty(&report)?;

    Ok(j)
}

fn inspect(args: &InspectArgs) -> Result<String, Box<dyn Error>> {
    let raw = fs::read(&args.bundle)?;
    let bundle = AvrBundle::from_cbor(&raw)?;

    Ok(format!(
        "body: {} bytes\ncertificate chain: {} bytes\nsignature: {} bytes",
        bundle.body.len(),
        bundle.certificate_chain.len(),
        bundle.signature.len()
    ))
}
