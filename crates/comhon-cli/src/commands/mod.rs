//! Subcommands and the document plumbing they share

pub mod convert;
pub mod validate;

use clap::{Args, ValueEnum};
use comhon_core::logging_facility;
use comhon_core::{
    Comhon, ComhonConfig, Format, Interfacer, InterfacerOptions, InstanceRef, JsonInterfacer,
    Model, XmlInterfacer,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Json,
    Xml,
}

impl From<FormatArg> for Format {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => Format::Json,
            FormatArg::Xml => Format::Xml,
        }
    }
}

/// Options every subcommand takes
#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Configuration file (TOML)
    #[arg(long, default_value = "comhon.toml")]
    pub config: PathBuf,

    /// Fully qualified model name of the document root, e.g. `Shop\Item`
    #[arg(long)]
    pub model: String,

    /// Document to read
    pub input: PathBuf,

    /// Format of the input, guessed from the extension when omitted
    #[arg(long)]
    pub from: Option<FormatArg>,

    /// Import and export private properties
    #[arg(long)]
    pub private: bool,
}

/// Everything a subcommand needs once the configuration is read
pub struct Session {
    pub config: ComhonConfig,
    pub comhon: Comhon,
    pub model: Arc<Model>,
    pub options: InterfacerOptions,
}

impl Session {
    pub async fn open(args: &SourceArgs) -> CliResult<Self> {
        let config = ComhonConfig::load(&args.config)?;
        logging_facility::init(config.log_profile);

        let comhon = Comhon::from_config(&config);
        let model = comhon.load_model(&args.model).await?;
        let mut options = config.interfacer_options();
        if args.private {
            options = options.with_private(true);
        }
        Ok(Self {
            config,
            comhon,
            model,
            options,
        })
    }

    /// Format of `path`: the explicit choice, else its extension, else the
    /// configured default
    pub fn format_of(&self, path: &Path, explicit: Option<FormatArg>) -> Format {
        if let Some(format) = explicit {
            return format.into();
        }
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Format::Json,
            Some("xml") => Format::Xml,
            _ => self.config.default_format,
        }
    }

    pub async fn import(&mut self, format: Format, text: &str) -> CliResult<InstanceRef> {
        let handle = match format {
            Format::Json => import_with(&mut self.comhon, &JsonInterfacer, text, &self.model, &self.options).await?,
            Format::Xml => import_with(&mut self.comhon, &XmlInterfacer, text, &self.model, &self.options).await?,
        };
        Ok(handle)
    }

    pub fn export(&self, handle: InstanceRef, format: Format, pretty: bool) -> CliResult<String> {
        let text = match format {
            Format::Json => export_with(&self.comhon, &JsonInterfacer, handle, &self.options, pretty)?,
            Format::Xml => export_with(&self.comhon, &XmlInterfacer, handle, &self.options, pretty)?,
        };
        Ok(text)
    }
}

async fn import_with<I: Interfacer>(
    comhon: &mut Comhon,
    interfacer: &I,
    text: &str,
    model: &Arc<Model>,
    options: &InterfacerOptions,
) -> comhon_core::Result<InstanceRef> {
    let node = interfacer.from_string(text)?;
    comhon.import_object(interfacer, &node, model, options).await
}

fn export_with<I: Interfacer>(
    comhon: &Comhon,
    interfacer: &I,
    handle: InstanceRef,
    options: &InterfacerOptions,
    pretty: bool,
) -> comhon_core::Result<String> {
    let node = comhon.export_object(handle, interfacer, options)?;
    interfacer.to_string(&node, pretty)
}
