use clap::{Parser, Subcommand};
use restkit::{Config, Delimiter, Error, MapCodec, ResultKind};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(version, about = "Query XML, convert JSON to XML and work with delimited maps")]
struct Args {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate an XPath 1.0 expression against an XML document
    Xpath {
        expression: String,
        /// XML input, stdin when omitted
        file: Option<PathBuf>,
        /// Result type: nodeset, string, number or boolean
        #[arg(short, long, default_value_t = ResultKind::NodeSet)]
        kind: ResultKind,
        /// Namespace binding as prefix=uri
        #[arg(short, long = "namespace", value_parser = parse_binding)]
        namespaces: Vec<(String, String)>,
    },
    /// Convert a JSON object or array to XML
    Json2xml { file: Option<PathBuf> },
    /// Encode a JSON object as a delimited map
    Encode {
        file: Option<PathBuf>,
        #[arg(long)]
        nv: Option<String>,
        #[arg(long)]
        entry: Option<String>,
    },
    /// Decode a delimited map into a JSON object
    Decode {
        file: Option<PathBuf>,
        #[arg(long)]
        nv: Option<String>,
        #[arg(long)]
        entry: Option<String>,
        /// Treat the entry separator as a regular expression
        #[arg(long)]
        pattern: bool,
    },
}

fn parse_binding(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((prefix, uri)) if !prefix.is_empty() => Ok((prefix.to_string(), uri.to_string())),
        _ => Err(format!("expected prefix=uri, got '{}'", s)),
    }
}

fn read_input(file: Option<&Path>) -> Result<String, Error> {
    match file {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

fn override_separators(config: &mut Config, nv: Option<String>, entry: Option<String>) -> &mut MapCodec {
    let codec = &mut config.codec;
    if let Some(nv) = nv {
        codec.nv_sep = nv;
    }
    if let Some(entry) = entry {
        codec.entry_sep = entry;
    }
    codec
}

fn run(args: Args) -> Result<(), Error> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match args.command {
        Command::Xpath { expression, file, kind, namespaces } => {
            config.namespaces.extend(namespaces);
            let xml = read_input(file.as_deref())?;
            let result = restkit::query(&expression, &xml, kind, &config)?;
            println!("{}", result);
        }
        Command::Json2xml { file } => {
            let json = read_input(file.as_deref())?;
            if let Some(xml) = restkit::json_to_xml_with(&json, &config.convert)? {
                println!("{}", xml);
            }
        }
        Command::Encode { file, nv, entry } => {
            let codec = override_separators(&mut config, nv, entry);
            let object: Map<String, Value> = serde_json::from_str(&read_input(file.as_deref())?)
                .map_err(restkit::ConvertError::from)?;
            let entries = object.into_iter().map(|(key, value)| match value {
                Value::String(s) => (key, s),
                other => (key, other.to_string()),
            });
            println!("{}", codec.encode(entries));
        }
        Command::Decode { file, nv, entry, pattern } => {
            let codec = override_separators(&mut config, nv, entry);
            if pattern {
                codec.delimiter = Delimiter::Pattern;
            }
            let decoded: BTreeMap<_, _> = codec.decode(&read_input(file.as_deref())?)?.into_iter().collect();
            let json = serde_json::to_string_pretty(&decoded).map_err(restkit::ConvertError::from)?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    log::debug!("{:?}", args);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error ({:?}): {}", e.kind(), e);
            ExitCode::FAILURE
        }
    }
}
