//! shiporder-xml command line
//!
//! アップロードされたブックを変換し、ステータスと生成したドキュメントの参照を表示します。

use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::error;
use shiporder_xml::{ConversionRun, ConverterBuilder, OutputTarget, XlsxToXmlError};

#[derive(Parser, Debug)]
#[command(name = "shiporder-xml")]
#[command(version, about = "Convert shaded Excel rows into shiporder XML documents", long_about = None)]
struct Cli {
    /// Uploaded workbook (.xlsx)
    input: Option<PathBuf>,

    /// Directory the record_<n>.xml files are written to
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Prefix of the references printed for each document
    #[arg(long, value_name = "NAME")]
    alias: Option<String>,

    /// Convert without writing any file
    #[arg(long)]
    dry_run: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(XlsxToXmlError::NoInput) => {
            println!("{}", XlsxToXmlError::NoInput);
            ExitCode::FAILURE
        }
        Err(err) => {
            error!("{:?}", err);
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), XlsxToXmlError> {
    let mut builder = ConverterBuilder::new();
    if cli.dry_run {
        builder = builder.with_output_target(OutputTarget::Memory);
    } else {
        if let Some(dir) = &cli.output_dir {
            builder = builder.with_output_dir(dir);
        }
        if let Some(alias) = &cli.alias {
            builder = builder.with_reference_alias(alias);
        }
    }
    let converter = builder.build()?;

    let upload = cli.input.as_ref().map(File::open).transpose()?;
    let run = converter.convert_upload(upload)?;
    print_run(&run, cli.json)
}

fn print_run(run: &ConversionRun, json: bool) -> Result<(), XlsxToXmlError> {
    if json {
        let summary = serde_json::to_string_pretty(&run.summary())
            .map_err(|e| XlsxToXmlError::Io(e.into()))?;
        println!("{}", summary);
        return Ok(());
    }

    println!("{}", run.status());
    for document in run.documents() {
        println!("{}", document.reference());
    }
    Ok(())
}
