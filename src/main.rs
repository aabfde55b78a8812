use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use base64::{engine::general_purpose, Engine as _};
use clap::{Parser, Subcommand};
use diploseal::codec::PixelGrid;
use diploseal::config::{Framing, ProtocolConfig};
use diploseal::crypto::calculate_key_id;
use diploseal::keystore::{read_private_key, read_public_key, KeyFiles};
use diploseal::protocol::{
    hide_message, issue_diploma, unveil_message, verify_diploma, PayloadLength,
    VerificationReport,
};
use diploseal::signature::{
    sign_message, verify_message, EcdsaP256, PassphrasePrompt, SignatureSource,
};
use diploseal::types::diploma::{DiplomaDraft, Grade};
use diploseal::{Error, Outcome};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON protocol configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override how the payload length is transmitted
    #[arg(long, global = true, value_enum)]
    framing: Option<Framing>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hide a message in an image
    Hide {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        message: String,
    },

    /// Unveil a message from an image
    Unveil {
        #[arg(long)]
        image: PathBuf,
        /// Message length (not needed with header framing)
        #[arg(long)]
        length: Option<usize>,
    },

    /// Generate an ECDSA P-256 key pair
    Genkey {
        /// Directory for the key files
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// File stem: writes <name>.pem and <name>.pub.pem
        #[arg(long, default_value = "issuer")]
        name: String,
        /// Leave the private key unencrypted
        #[arg(long)]
        no_passphrase: bool,
    },

    /// Sign a message with a detached signature
    Sign {
        #[arg(long)]
        message: String,
        /// Private key PEM file
        #[arg(long)]
        key: PathBuf,
        /// Signature output file (raw DER)
        #[arg(long)]
        output: PathBuf,
    },

    /// Verify a detached signature
    Verify {
        #[arg(long)]
        message: String,
        /// Public key PEM file
        #[arg(long)]
        key: PathBuf,
        /// Signature file (raw DER)
        #[arg(long, conflicts_with = "signature_b64", required_unless_present = "signature_b64")]
        signature: Option<PathBuf>,
        /// Base64 signature given inline
        #[arg(long)]
        signature_b64: Option<String>,
    },

    /// Issue a signed diploma hidden in a background image
    Diploma {
        /// Background (carrier) image
        #[arg(long)]
        background: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Private key PEM file
        #[arg(long)]
        key: PathBuf,
        /// Recipient name
        #[arg(long)]
        name: String,
        /// Average, e.g. 15 or 15.5
        #[arg(long)]
        average: String,
        #[arg(long, default_value = "master en alchimie")]
        title: String,
        /// Date as dd/mm/yyyy (defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Verify a diploma image
    VerifyDiploma {
        #[arg(long)]
        image: PathBuf,
        /// Public key PEM file
        #[arg(long)]
        key: PathBuf,
        /// Embedded length shown on the diploma (not needed with header framing)
        #[arg(long)]
        length: Option<usize>,
        /// Print a JSON report
        #[arg(long)]
        json: bool,
    },
}

/// Hidden passphrase input on the terminal.
struct ConsolePrompt {
    term: console::Term,
}

impl ConsolePrompt {
    fn new() -> Self {
        Self {
            term: console::Term::stderr(),
        }
    }

    fn read(&self, label: &str) -> Result<String, Error> {
        self.term.write_str(label)?;
        Ok(self.term.read_secure_line()?)
    }
}

impl PassphrasePrompt for ConsolePrompt {
    fn acquire_passphrase(&mut self, confirm: bool) -> Result<String, Error> {
        let first = self.read("Passphrase: ")?;
        if confirm && first != self.read("Confirm passphrase: ")? {
            return Err(Error::InvalidKey("passphrases do not match".to_string()));
        }
        Ok(first)
    }
}

fn load_grid(path: &Path) -> anyhow::Result<PixelGrid> {
    let img = image::open(path)
        .with_context(|| format!("cannot open image {}", path.display()))?
        .to_rgb8();
    let (width, height) = img.dimensions();
    Ok(PixelGrid::from_raw(width, height, img.into_raw())?)
}

fn save_grid(grid: PixelGrid, path: &Path) -> anyhow::Result<()> {
    let lossless = matches!(
        image::ImageFormat::from_path(path),
        Ok(image::ImageFormat::Png)
    );
    if !lossless {
        warn!(path = %path.display(), "output is not PNG; lossy formats destroy the hidden payload");
    }
    let (width, height) = (grid.width(), grid.height());
    let img = image::RgbImage::from_raw(width, height, grid.into_raw())
        .context("pixel buffer does not match image dimensions")?;
    img.save(path)
        .with_context(|| format!("cannot write image {}", path.display()))?;
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<ProtocolConfig> {
    let mut config = match &cli.config {
        Some(path) => ProtocolConfig::from_file(path)?,
        None => ProtocolConfig::default(),
    };
    if let Some(framing) = cli.framing {
        config.framing = framing;
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Hide {
            image,
            output,
            message,
        } => {
            let grid = load_grid(&image)?;
            let (stego, length) = hide_message(&grid, &message, &config)?;
            save_grid(stego, &output)?;
            info!(output = %output.display(), length, "message hidden");
            println!("Message length: {}", length);
        }

        Commands::Unveil { image, length } => {
            let grid = load_grid(&image)?;
            let length = PayloadLength::for_config(&config, length)?;
            println!("{}", unveil_message(&grid, length)?);
        }

        Commands::Genkey {
            dir,
            name,
            no_passphrase,
        } => {
            let files = KeyFiles::in_dir(&dir, &name);
            let mut prompt = ConsolePrompt::new();
            let prompt: Option<&mut dyn PassphrasePrompt> = if no_passphrase {
                None
            } else {
                Some(&mut prompt)
            };
            let key_pair = files.generate(prompt)?;
            let public = diploseal::crypto::load_public_key_pem(&key_pair.public_key_pem)?;
            println!("Private key: {}", files.private_key.display());
            println!("Public key:  {}", files.public_key.display());
            println!("Key ID:      {}", calculate_key_id(&public)?);
        }

        Commands::Sign {
            message,
            key,
            output,
        } => {
            let secret = read_private_key(&key, &mut ConsolePrompt::new())?;
            let signature = sign_message(&EcdsaP256, &message, &secret)?;
            std::fs::write(&output, &signature)
                .with_context(|| format!("cannot write {}", output.display()))?;
            info!(output = %output.display(), "signature written");
        }

        Commands::Verify {
            message,
            key,
            signature,
            signature_b64,
        } => {
            let public = read_public_key(&key)?;
            let source = match (signature, signature_b64) {
                (Some(path), _) => SignatureSource::FilePath(path),
                (None, Some(b64)) => SignatureSource::Bytes(
                    general_purpose::STANDARD
                        .decode(b64.trim())
                        .context("signature is not valid base64")?,
                ),
                (None, None) => bail!("either --signature or --signature-b64 is required"),
            };
            if verify_message(&EcdsaP256, &message, source, &public)? {
                println!("Signature is valid");
            } else {
                println!("Signature is NOT valid");
                std::process::exit(1);
            }
        }

        Commands::Diploma {
            background,
            output,
            key,
            name,
            average,
            title,
            date,
        } => {
            let average: Grade = average.parse()?;
            let date = date.unwrap_or_else(|| chrono::Local::now().format("%d/%m/%Y").to_string());
            let draft = DiplomaDraft::new(title, name, date, average);

            let secret = read_private_key(&key, &mut ConsolePrompt::new())?;
            let carrier = load_grid(&background)?;
            let issued = issue_diploma(&carrier, draft, &EcdsaP256, &secret, &config)?;
            save_grid(issued.image, &output)?;

            println!("Diploma written to {}", output.display());
            println!("Embedded length: {}", issued.embedded_length);
        }

        Commands::VerifyDiploma {
            image,
            key,
            length,
            json,
        } => {
            let public = read_public_key(&key)?;
            let key_id = calculate_key_id(&public)?;
            let grid = load_grid(&image)?;
            let length = PayloadLength::for_config(&config, length)?;

            let result = verify_diploma(&grid, length, &EcdsaP256, &public);
            let report = VerificationReport::from_result(&result, Some(&key_id));
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                match &result {
                    Ok(Outcome::Valid(record)) => {
                        println!("Diploma is valid");
                        println!("  Title:   {}", record.title);
                        println!("  Awarded: {}", record.recipient_name);
                        println!("  Date:    {}", record.date);
                        println!("  Average: {}/20", record.average);
                    }
                    Ok(Outcome::Invalid(_)) => println!("Diploma is NOT valid"),
                    Err(e) => println!("Diploma could not be read: {}", e),
                }
            }
            if !report.valid {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
