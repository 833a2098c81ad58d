use std::fs;
use std::io;
use std::path::PathBuf;

use clap::{
    Args,
    Parser,
    Subcommand,
    ValueEnum,
};
use smart_ftl::config::CrcMode;
use smart_ftl_tool::{
    hex_dump,
    write_map_csv,
    Image,
    ImageOptions,
};

#[derive(Parser)]
#[command(name = "smart-ftl-tool")]
#[command(about = "Create and inspect smart-ftl flash images", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a formatted image
    Format {
        /// Output image path
        image: PathBuf,

        /// Image size in bytes (must be multiple of 4096)
        #[arg(short, long, value_parser = parse_size)]
        size: usize,

        /// Number of root directory sectors, 1 to 8
        #[arg(long, default_value_t = 1)]
        root_dirs: u8,

        #[command(flatten)]
        options: Options,
    },
    /// Print the format information and sector statistics
    Info {
        image: PathBuf,

        #[command(flatten)]
        options: Options,
    },
    /// Print the logical to physical sector map
    Map {
        image: PathBuf,

        /// Write the map to a CSV file instead
        #[arg(long)]
        csv: Option<PathBuf>,

        #[command(flatten)]
        options: Options,
    },
    /// Hex dump the payload of a logical sector
    Dump {
        image: PathBuf,

        #[arg(value_parser = parse_size)]
        logical: usize,

        #[command(flatten)]
        options: Options,
    },
    /// Store the content of a file in a new sector
    Put {
        image: PathBuf,

        /// File whose content is stored, it has to fit into one sector
        input: PathBuf,

        /// Logical sector to allocate, the first free one if omitted
        #[arg(long)]
        logical: Option<u16>,

        #[command(flatten)]
        options: Options,
    },
}

#[derive(Args)]
struct Options {
    /// Sector size in bytes
    #[arg(long, default_value_t = 512)]
    sector_size: u16,

    #[arg(long, value_enum, default_value_t = Crc::None)]
    crc: Crc,

    /// Erase blocks at the end of the image used for the journal
    #[arg(long, default_value_t = 0)]
    journal_blocks: u16,

    #[arg(long)]
    no_wear_leveling: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Crc {
    None,
    Crc8,
    Crc16,
    Crc32,
}

impl From<&Options> for ImageOptions {
    fn from(options: &Options) -> Self {
        ImageOptions {
            sector_size: options.sector_size,
            crc: match options.crc {
                Crc::None => CrcMode::Disabled,
                Crc::Crc8 => CrcMode::Crc8,
                Crc::Crc16 => CrcMode::Crc16,
                Crc::Crc32 => CrcMode::Crc32,
            },
            journal_blocks: options.journal_blocks,
            wear_leveling: !options.no_wear_leveling,
        }
    }
}

fn parse_size(s: &str) -> Result<usize, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        usize::from_str_radix(hex, 16).map_err(|e| e.to_string())
    } else {
        s.parse::<usize>().map_err(|e| e.to_string())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Format {
            image,
            size,
            root_dirs,
            options,
        } => {
            let ftl = Image::format(size, &(&options).into(), root_dirs)?;
            let info = ftl.info()?;
            ftl.save(&image)?;

            println!("Formatted image: {}", image.display());
            println!(
                "{} sectors of {} bytes, {} free",
                info.total_sectors, info.sector_size, info.free_sectors
            );
            Ok(())
        }
        Commands::Info { image, options } => {
            let ftl = Image::load(&image, &(&options).into())?;
            let info = ftl.info()?;
            let statistics = ftl.statistics()?;

            println!("Image: {}", image.display());
            println!("  format version:  {}", info.format_version);
            println!("  sector size:     {}", info.sector_size);
            println!("  payload bytes:   {}", info.available_bytes);
            println!("  total sectors:   {}", info.total_sectors);
            println!("  free sectors:    {}", info.free_sectors);
            println!("  name length:     {}", info.name_len);
            println!("  root dirs:       {}", info.root_dirs);
            println!("  crc:             {}", info.crc);
            println!("  journal blocks:  {}", info.journal_blocks);
            println!(
                "  sectors:         {} free, {} released, {} committed, {} leaked",
                statistics.free, statistics.released, statistics.committed, statistics.leaked
            );
            println!("  block  free  released  committed  wear");
            for (index, block) in statistics.blocks.iter().enumerate() {
                println!(
                    "  {:>5}  {:>4}  {:>8}  {:>9}  {:>4}",
                    index, block.free, block.released, block.committed, block.wear
                );
            }
            Ok(())
        }
        Commands::Map {
            image,
            csv,
            options,
        } => {
            let mut ftl = Image::load(&image, &(&options).into())?;
            let entries = ftl.sector_map()?;
            match csv {
                Some(path) => {
                    write_map_csv(&entries, fs::File::create(&path)?)?;
                    println!("Wrote {} entries to {}", entries.len(), path.display());
                }
                None => write_map_csv(&entries, io::stdout().lock())?,
            }
            Ok(())
        }
        Commands::Dump {
            image,
            logical,
            options,
        } => {
            let logical = u16::try_from(logical)?;
            let mut ftl = Image::load(&image, &(&options).into())?;
            print!("{}", hex_dump(&ftl.read_payload(logical)?));
            Ok(())
        }
        Commands::Put {
            image,
            input,
            logical,
            options,
        } => {
            let data = fs::read(&input)?;
            let mut ftl = Image::load(&image, &(&options).into())?;
            let logical = ftl.store(logical, &data)?;
            ftl.save(&image)?;

            println!("Stored {} bytes in logical sector {}", data.len(), logical);
            Ok(())
        }
    }
}
