use anyhow::{Context, Result, bail, format_err};
use clap::{Arg, ArgAction, ArgMatches, Command};
use dialoguer::Confirm;
use indoc::indoc;
use log::{LevelFilter, info};
use quick_xml::Reader;
use simplelog::{Config, WriteLogger};

use mapped_json::{MappedJsonDriver, WriterSettings, xml};

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::exit;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum InputFormat {
    Xml,
    Json,
}

impl InputFormat {
    /// `.json` files are read as JSON, everything else (including stdin) as XML.
    fn infer(input: &Path) -> Self {
        match input.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => InputFormat::Json,
            _ => InputFormat::Xml,
        }
    }
}

struct MappedJsonDump {
    input: PathBuf,
    input_format: InputFormat,
    settings: WriterSettings,
    output_target: Option<PathBuf>,
    confirm_overwrite: bool,
    verbosity_level: Option<LevelFilter>,
}

impl MappedJsonDump {
    pub fn from_cli_matches(matches: &ArgMatches) -> Result<Self> {
        let input = PathBuf::from(
            matches
                .get_one::<String>("INPUT")
                .ok_or_else(|| format_err!("INPUT is a required argument"))?,
        );

        let input_format = match matches.get_one::<String>("from").map(String::as_str) {
            Some("json") => InputFormat::Json,
            Some("xml") => InputFormat::Xml,
            Some(other) => bail!("unknown input format `{}`", other),
            None => InputFormat::infer(&input),
        };

        let mut settings = match matches.get_one::<String>("config") {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("failed to read settings file `{}`", path))?;
                WriterSettings::from_json_str(&text)
                    .with_context(|| format!("invalid settings file `{}`", path))?
            }
            // Interactive output is indented unless asked otherwise.
            None => WriterSettings::new().indent(true),
        };

        if matches.get_flag("legacy") {
            settings = settings.use_array_hints(false);
        }
        if let Some(names) = matches.get_many::<String>("array") {
            for name in names {
                settings = settings.serialize_as_array(name.clone());
            }
        }
        if let Some(prefix) = matches.get_one::<String>("attribute-prefix") {
            settings = settings.attribute_prefix(prefix.clone());
        }
        if let Some(label) = matches.get_one::<String>("encoding") {
            settings = settings.default_encoding(label.clone());
        }
        if matches.get_flag("drop-root") {
            settings = settings.drop_root_element(true);
        }
        if matches.get_flag("no-indent") {
            settings = settings.indent(false);
        }

        let verbosity_level = match matches.get_count("verbose") {
            0 => None,
            1 => Some(LevelFilter::Info),
            2 => Some(LevelFilter::Debug),
            3 => Some(LevelFilter::Trace),
            _ => {
                eprintln!("using more than -vvv does not affect verbosity level");
                Some(LevelFilter::Trace)
            }
        };

        Ok(MappedJsonDump {
            input,
            input_format,
            settings,
            output_target: matches.get_one::<String>("output-target").map(PathBuf::from),
            confirm_overwrite: !matches.get_flag("no-confirm-overwrite"),
            verbosity_level,
        })
    }

    /// Main entry point for `MappedJsonDump`
    pub fn run(&self) -> Result<()> {
        self.try_to_initialize_logging();

        let driver = MappedJsonDriver::new(self.settings.clone())?;
        let input = self.read_input()?;

        let output = match self.input_format {
            InputFormat::Xml => {
                let mut writer = driver.create_writer(Vec::new());
                let started = xml::stream_xml(
                    Reader::from_reader(&input[..]),
                    &driver.collection_hints(),
                    &mut writer,
                )
                .with_context(|| format!("failed to convert `{}`", self.input.display()))?;
                info!("converted {} element(s) to JSON", started);
                writer.close()?
            }
            InputFormat::Json => {
                let reader = driver
                    .create_reader(&input[..])
                    .with_context(|| format!("failed to read `{}`", self.input.display()))?;
                info!(
                    "converted {} node(s) to XML",
                    reader.document().node_count()
                );
                xml::write_xml(reader.document(), Vec::new(), self.settings.should_indent())?
            }
        };

        self.write_output(&output)
    }

    fn read_input(&self) -> Result<Vec<u8>> {
        let mut input = Vec::new();
        if self.input.as_os_str() == "-" {
            io::stdin()
                .read_to_end(&mut input)
                .context("failed to read stdin")?;
        } else {
            File::open(&self.input)
                .and_then(|mut f| f.read_to_end(&mut input))
                .with_context(|| format!("failed to open file `{}`", self.input.display()))?;
        }
        Ok(input)
    }

    fn write_output(&self, output: &[u8]) -> Result<()> {
        match &self.output_target {
            Some(path) => {
                let mut file = Self::create_output_file(path, self.confirm_overwrite)?;
                file.write_all(output)?;
                file.flush()?;
            }
            None => {
                let stdout = io::stdout();
                let mut lock = stdout.lock();
                lock.write_all(output)?;
                writeln!(lock)?;
            }
        }
        Ok(())
    }

    /// If `prompt` is passed, will display a confirmation prompt before overwriting files.
    fn create_output_file(path: impl AsRef<Path>, prompt: bool) -> Result<File> {
        let p = path.as_ref();

        if p.is_dir() {
            bail!(
                "There is a directory at {}, refusing to overwrite",
                p.display()
            );
        }

        if p.exists() {
            if prompt {
                match Confirm::new()
                    .with_prompt(format!(
                        "Are you sure you want to override output file at {}",
                        p.display()
                    ))
                    .default(false)
                    .interact()
                {
                    Ok(true) => Ok(File::create(p)?),
                    Ok(false) => bail!("Cancelled"),
                    Err(e) => bail!(
                        "Failed to write confirmation prompt to term caused by\n{}",
                        e
                    ),
                }
            } else {
                Ok(File::create(p)?)
            }
        } else {
            // Ok to assume p is not an existing directory
            match p.parent() {
                Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
                    fs::create_dir_all(parent)?;
                    Ok(File::create(p)?)
                }
                Some(_) => Ok(File::create(p)?),
                None => bail!("Output file cannot be root."),
            }
        }
    }

    fn try_to_initialize_logging(&self) {
        if let Some(level) = self.verbosity_level {
            if let Err(e) = WriteLogger::init(level, Config::default(), io::stderr()) {
                eprintln!("Failed to initialize logging: {}", e);
            }
        }
    }
}

fn cli() -> Command {
    Command::new("mjson_dump")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Converts XML to mapped JSON and back")
        .arg(Arg::new("INPUT").required(true).help("Input file, or `-` for stdin"))
        .arg(
            Arg::new("from")
                .long("from")
                .value_parser(["xml", "json"])
                .help("Input syntax, inferred from the file extension by default")
                .long_help(indoc!(
                    r#"
                    Sets the input syntax; the output is the other one:
                        "xml"  - reads XML, prints mapped JSON.
                        "json" - reads mapped JSON, prints XML.
                    When omitted, `.json` inputs are read as JSON and everything else as XML.
                    "#
                )),
        )
        .arg(
            Arg::new("output-target")
                .long("output")
                .short('f')
                .help(indoc!(
                    "Writes output to the file specified instead of stdout,
                     errors will still be printed to stderr.
                     Will ask for confirmation before overwriting files,
                     to allow overwriting, pass `--no-confirm-overwrite`.
                     Will create parent directories if needed."
                )),
        )
        .arg(
            Arg::new("no-confirm-overwrite")
                .long("no-confirm-overwrite")
                .action(ArgAction::SetTrue)
                .help(
                    "When set, will not ask for confirmation before overwriting files, \
                     useful for automation",
                ),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("Loads writer settings from a JSON file; other flags override it"),
        )
        .arg(
            Arg::new("legacy")
                .long("legacy")
                .action(ArgAction::SetTrue)
                .help("Ignores array hints: repeated elements keep only their last occurrence"),
        )
        .arg(
            Arg::new("array")
                .long("array")
                .value_name("NAME")
                .action(ArgAction::Append)
                .help("Treats elements with this name as collection members (repeatable)"),
        )
        .arg(
            Arg::new("attribute-prefix")
                .long("attribute-prefix")
                .value_name("PREFIX")
                .help("Prefix of attribute keys, `@` by default"),
        )
        .arg(
            Arg::new("encoding")
                .long("encoding")
                .value_name("LABEL")
                .help("Encoding of JSON output and input, `utf-8` by default"),
        )
        .arg(
            Arg::new("drop-root")
                .long("drop-root")
                .action(ArgAction::SetTrue)
                .help("Omits the root element's key from JSON output"),
        )
        .arg(
            Arg::new("no-indent")
                .long("no-indent")
                .action(ArgAction::SetTrue)
                .help("When set, output will not be indented."),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help(indoc!(
                    "-v - info, -vv - debug, -vvv - trace.
                     trace output is only available in debug builds, as it is extremely verbose"
                )),
        )
}

fn main() {
    let matches = cli().get_matches();

    let result = MappedJsonDump::from_cli_matches(&matches).and_then(|app| app.run());
    if let Err(e) = result {
        eprintln!("{:?}", e);
        exit(1)
    }
}
