use bfs::{
    BUILD_INFO, VERSION,
    config::{BfsConfig, BfsConfigBuilder, LogConfig},
    errors::BfsError,
    fs_impl::{DiskBfs, Whence},
    health_check, init,
    utils::Utils,
};
use clap::{Parser, Subcommand};
use log::{error, info};
use std::path::Path;

#[derive(Parser)]
#[command(name = "bfs")]
#[command(version = VERSION)]
#[command(about = "Byte-stream files on a fixed-block disk image")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, default_value = "bfs.json")]
    config: String,

    /// Disk image path, overriding the configuration
    #[arg(short, long)]
    disk: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Configuration file path
        config_path: String,
    },

    /// Validate configuration
    Validate {
        /// Configuration file path
        config_path: String,
    },

    /// Create and format the disk image
    Format,

    /// Mount the disk image and report its state
    Mount,

    /// Write data into a file, creating it if needed
    Write {
        /// File name
        name: String,

        /// Data to write
        #[arg(long, conflicts_with = "input")]
        data: Option<String>,

        /// Host file whose contents are written
        #[arg(long)]
        input: Option<String>,

        /// Byte offset to write at; omit to replace the file
        #[arg(long)]
        offset: Option<u64>,
    },

    /// Print a file's contents
    Cat {
        /// File name
        name: String,

        /// Byte offset to start at
        #[arg(long, default_value_t = 0)]
        offset: u64,

        /// Maximum bytes to read
        #[arg(long)]
        len: Option<usize>,
    },

    /// List files with their sizes
    Stat,

    /// Run diagnostics and health check
    Health,

    /// Demonstrate BFS functionality
    Demo,

    /// Show system information
    Info,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.verbose {
        unsafe { std::env::set_var("RUST_LOG", "debug") };
    } else if std::env::var_os("RUST_LOG").is_none() {
        unsafe { std::env::set_var("RUST_LOG", "info") };
    }

    init()?;

    let result = match cli.command {
        Commands::Init { config_path } => initialize_config(&config_path),
        Commands::Validate { config_path } => validate_config(&config_path),
        Commands::Format => load_config(&cli.config, cli.disk).and_then(|c| format_disk(&c)),
        Commands::Mount => load_config(&cli.config, cli.disk).and_then(|c| mount_disk(&c)),
        Commands::Write {
            name,
            data,
            input,
            offset,
        } => load_config(&cli.config, cli.disk)
            .and_then(|c| write_file(&c, &name, data, input, offset)),
        Commands::Cat { name, offset, len } => {
            load_config(&cli.config, cli.disk).and_then(|c| cat_file(&c, &name, offset, len))
        }
        Commands::Stat => load_config(&cli.config, cli.disk).and_then(|c| list_files(&c)),
        Commands::Health => load_config(&cli.config, cli.disk).and_then(|c| run_health_check(&c)),
        Commands::Demo => run_demo(),
        Commands::Info => show_system_info(),
    };

    if let Err(e) = &result
        && let Some(bfs_err) = e.downcast_ref::<BfsError>()
        && bfs_err.is_fatal()
    {
        error!("Fatal: {bfs_err}");
    }
    result
}

/// Configuration from `config_path` if it exists, otherwise defaults with the
/// access log off.
fn load_config(
    config_path: &str,
    disk: Option<String>,
) -> Result<BfsConfig, Box<dyn std::error::Error>> {
    let mut config = if Path::new(config_path).exists() {
        BfsConfig::from_file(config_path)?
    } else {
        BfsConfigBuilder::new()
            .logging(LogConfig::disabled())
            .build()?
    };

    if let Some(disk) = disk {
        config.disk_path = disk;
    }
    config.validate()?;
    Ok(config)
}

fn initialize_config(config_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    info!("Initializing BFS configuration at {config_path}");

    let config = BfsConfigBuilder::new().build()?;
    config.save_to_file(config_path)?;

    info!("Configuration saved to {config_path}");
    Ok(())
}

fn validate_config(config_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    info!("Validating configuration at {config_path}");

    let config = BfsConfig::from_file(config_path)?;
    match config.validate() {
        Ok(()) => {
            let geometry = &config.geometry;
            info!("✓ Configuration is valid");
            info!("Disk image: {}", config.disk_path);
            info!(
                "Geometry: {} blocks of {} bytes, {} inodes",
                geometry.total_blocks, geometry.block_size, geometry.inode_count
            );
            info!("Open-file table: {} entries", geometry.max_open_files);
            info!(
                "Logging: {}",
                if config.logging.enabled {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            Ok(())
        }
        Err(e) => {
            info!("✗ Configuration is invalid: {e}");
            Err(Box::new(e))
        }
    }
}

fn format_disk(config: &BfsConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Formatting {}", config.disk_path);

    let fs = DiskBfs::format(config)?;
    let stats = fs.store().stats();
    fs.unmount()?;

    println!(
        "Formatted {}: {} blocks of {} bytes, {} data blocks, {} inodes",
        config.disk_path, stats.total_blocks, stats.block_size, stats.data_blocks, stats.inode_count
    );
    Ok(())
}

fn mount_disk(config: &BfsConfig) -> Result<(), Box<dyn std::error::Error>> {
    let fs = DiskBfs::mount(config)?;
    let stats = fs.store().stats();
    fs.unmount()?;

    println!("Disk {} mounted cleanly", config.disk_path);
    println!(
        "  files: {}/{}  free: {}/{} blocks ({})",
        stats.files,
        stats.inode_count,
        stats.free_blocks,
        stats.data_blocks,
        Utils::format_file_size(u64::from(stats.free_blocks) * u64::from(stats.block_size))
    );
    Ok(())
}

fn write_file(
    config: &BfsConfig,
    name: &str,
    data: Option<String>,
    input: Option<String>,
    offset: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = match (data, input) {
        (Some(data), _) => data.into_bytes(),
        (None, Some(input)) => std::fs::read(&input)?,
        (None, None) => return Err("either --data or --input is required".into()),
    };

    let mut fs = DiskBfs::mount(config)?;
    let fd = match offset {
        // Patch in place, creating the file only if it is missing
        Some(offset) => {
            let fd = match fs.open(name) {
                Err(BfsError::NotFound(_)) => fs.create(name)?,
                other => other?,
            };
            let offset = i64::try_from(offset).map_err(|_| BfsError::BadCursor(i64::MAX))?;
            fs.seek(fd, offset, Whence::Set)?;
            fd
        }
        None => fs.create(name)?,
    };

    fs.write(fd, &bytes)?;
    let size = fs.size(fd)?;
    fs.close(fd)?;
    fs.unmount()?;

    println!(
        "Wrote {} to {name} ({} total)",
        Utils::format_file_size(bytes.len() as u64),
        Utils::format_file_size(size)
    );
    Ok(())
}

fn cat_file(
    config: &BfsConfig,
    name: &str,
    offset: u64,
    len: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    use std::io::Write;

    let mut fs = DiskBfs::mount(config)?;
    let fd = fs.open(name)?;
    let offset = i64::try_from(offset).map_err(|_| BfsError::BadCursor(i64::MAX))?;
    fs.seek(fd, offset, Whence::Set)?;

    let data = fs.read_to_vec(fd, len.unwrap_or(usize::MAX))?;
    fs.close(fd)?;
    fs.unmount()?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&data)?;
    stdout.flush()?;
    Ok(())
}

fn list_files(config: &BfsConfig) -> Result<(), Box<dyn std::error::Error>> {
    let fs = DiskBfs::mount(config)?;
    let mut entries = fs.store().entries();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    for (name, inum, size) in &entries {
        println!(
            "{:<28} {:>10}  {inum}",
            name,
            Utils::format_file_size(*size)
        );
    }
    println!("{} file(s)", entries.len());

    fs.unmount()?;
    Ok(())
}

fn run_health_check(config: &BfsConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Running BFS health check");

    match health_check(config) {
        Ok(report) => {
            println!("BFS Health Check Report:");
            println!("{report}");
        }
        Err(e) => {
            println!("Health check failed: {e}");
            return Err(Box::new(e));
        }
    }

    Ok(())
}

fn run_demo() -> Result<(), Box<dyn std::error::Error>> {
    info!("Running BFS demonstration");

    let demo_dir = Path::new("/tmp/bfs_demo");
    std::fs::create_dir_all(demo_dir)?;

    let config = BfsConfigBuilder::new()
        .disk_path(demo_dir.join("BFSDISK").to_string_lossy().to_string())
        .logging(LogConfig {
            enabled: true,
            file_path: demo_dir.join("access.log").to_string_lossy().to_string(),
            level: "info".to_string(),
            max_size: 1024 * 1024, // 1MB for demo
            rotation_count: 2,
        })
        .build()?;

    let mut fs = DiskBfs::format(&config)?;
    let block_size = fs.block_size();

    println!("BFS Block-Aligned Stream Demo");
    println!("=============================");
    println!("Disk image: {} ({block_size}-byte blocks)", config.disk_path);

    let fd = fs.create("demo.bin")?;
    fs.write(fd, &[0xAB; 600])?;
    println!(
        "Wrote 600 bytes of 0xAB: size {}, cursor {}",
        fs.size(fd)?,
        fs.tell(fd)?
    );

    fs.seek(fd, 100, Whence::Set)?;
    fs.write(fd, &[0xCD; 50])?;
    println!(
        "Overwrote 50 bytes at 100 with 0xCD: size {}, cursor {}",
        fs.size(fd)?,
        fs.tell(fd)?
    );

    fs.seek(fd, 0, Whence::Set)?;
    let data = fs.read_to_vec(fd, 600)?;
    let intact = data[..100].iter().all(|&b| b == 0xAB)
        && data[100..150].iter().all(|&b| b == 0xCD)
        && data[150..].iter().all(|&b| b == 0xAB);
    println!(
        "Read back {} bytes: {}",
        data.len(),
        if intact {
            "surrounding bytes preserved"
        } else {
            "MISMATCH"
        }
    );

    match fs.open("missing") {
        Err(e) if !e.is_fatal() => println!("open(\"missing\"): {e} (recoverable)"),
        Err(e) => return Err(Box::new(e)),
        Ok(_) => return Err("opened a file that does not exist".into()),
    }

    fs.close(fd)?;
    fs.unmount()?;
    println!("\nDemo completed. Access log: {}", config.logging.file_path);

    Ok(())
}

fn show_system_info() -> Result<(), Box<dyn std::error::Error>> {
    println!("BFS - Block File System");
    println!("Version: {VERSION}");
    println!("Build Info: {BUILD_INFO}");

    println!("\nUsage:");
    println!("  bfs init <config_path>        - Write a default configuration");
    println!("  bfs validate <config_path>    - Validate configuration");
    println!("  bfs format                    - Create and format the disk image");
    println!("  bfs mount                     - Mount and report disk state");
    println!("  bfs write <name> --data <s>   - Write into a file");
    println!("  bfs cat <name>                - Print a file");
    println!("  bfs stat                      - List files");
    println!("  bfs health                    - Run health check");
    println!("  bfs demo                      - Run demonstration");
    println!("  bfs info                      - Show this information");

    Ok(())
}
