//! kvbridge quickstart
//!
//! Walks through the bindings against a scratch directory.
//!
//! # Commands
//!
//! - `basics` - Typed values, buffers, removal and enumeration
//! - `rekey` - Encrypt, rotate and drop a crypt key
//! - `backup` - Back up and restore an encrypted store
//! - `expire` - Per-key and default expiration
//! - `all` - Everything above, in order

use clap::{Parser, Subcommand};
use kvbridge::{ErrorType, Kv, LogLevel, LogMessage, Mode, OpenOptions, RecoverStrategy};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const TEXT: &str = "Hello world, 你好 from kvbridge!";
const BYTES: &[u8] = "Hello world, 你好 from kvbridge and bytes!".as_bytes();

/// kvbridge walkthrough.
#[derive(Parser)]
#[command(name = "kvbridge-quickstart")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Root directory for stores
    #[arg(global = true, short, long, default_value = "/tmp/kvbridge")]
    root: PathBuf,

    /// Directory for backups
    #[arg(global = true, short, long, default_value = "/tmp/kvbridge_backup")]
    backup_dir: PathBuf,

    /// Print native log records instead of routing them to tracing
    #[arg(global = true, long)]
    redirect: bool,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Typed values, buffers, removal and enumeration
    Basics,
    /// Encrypt, rotate and drop a crypt key
    Rekey,
    /// Back up and restore an encrypted store
    Backup,
    /// Per-key and default expiration
    Expire,
    /// Run every walkthrough
    All,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    if cli.redirect {
        kvbridge::initialize_with_log_handler(&cli.root, level, print_log)?;
    } else {
        kvbridge::initialize(&cli.root, level)?;
    }
    kvbridge::register_error_handler(on_error);
    kvbridge::register_content_change_handler(|id| {
        println!("{id} content changed by other process");
    });
    info!(root = %cli.root.display(), version = kvbridge::version(), "initialized");

    match cli.command {
        Commands::Basics => basics()?,
        Commands::Rekey => rekey()?,
        Commands::Backup => backup(&cli.backup_dir)?,
        Commands::Expire => expire()?,
        Commands::All => {
            basics()?;
            rekey()?;
            backup(&cli.backup_dir)?;
            expire()?;
        }
    }

    kvbridge::on_exit();
    Ok(())
}

fn print_log(record: &LogMessage) {
    let tag = match record.level {
        LogLevel::Debug => "[D]",
        LogLevel::Info => "[I]",
        LogLevel::Warning => "[W]",
        LogLevel::Error => "[E]",
        LogLevel::None => "[N]",
    };
    println!(
        "Redirect {tag} <{}:{}::{}> {}",
        record.file, record.line, record.function, record.message
    );
}

fn on_error(id: &str, error: ErrorType) -> RecoverStrategy {
    let desc = match error {
        ErrorType::CrcCheckFail => "CRC-Error",
        ErrorType::FileLength => "File-Length-Error",
    };
    println!("{id} has error type: {desc}");
    RecoverStrategy::Recover
}

fn basics() -> kvbridge::Result<()> {
    let kv = kvbridge::default_kv()?;
    println!("actual size: {}", kv.actual_size());
    println!("total size: {}", kv.total_size());

    fill(&kv);
    print_values(&kv);

    if let Some(buffer) = kv.get_string_buffer("string") {
        println!("string(buffer) = {}", buffer.to_string_lossy());
    }
    if let Some(buffer) = kv.get_bytes_buffer("bytes") {
        println!("bytes(buffer) = {}", String::from_utf8_lossy(buffer.as_bytes()));
    }

    remove_some(&kv);
    println!("count = {}, all keys: {:?}", kv.count(), kv.all_keys());

    kv.trim();
    kv.clear_memory_cache();
    println!("all keys: {:?}", kv.all_keys());
    kv.clear_all();
    println!("all keys: {:?}", kv.all_keys());
    kv.sync();
    kv.close();
    Ok(())
}

fn fill(kv: &Kv) {
    kv.set("bool", true);
    kv.set("int32", i32::MIN);
    kv.set("uint32", u32::MAX);
    kv.set("int64", i64::MIN);
    kv.set("uint64", u64::MAX);
    kv.set("float32", f32::MAX);
    kv.set("float64", f64::MAX);
    kv.set_string("string", TEXT);
    kv.set_bytes("bytes", BYTES);
}

fn print_values(kv: &Kv) {
    println!("bool = {}", kv.get::<bool>("bool"));
    println!("int32 = {}", kv.get::<i32>("int32"));
    println!("uint32 = {}", kv.get::<u32>("uint32"));
    println!("int64 = {}", kv.get::<i64>("int64"));
    println!("uint64 = {}", kv.get::<u64>("uint64"));
    println!("float32 = {}", kv.get::<f32>("float32"));
    println!("float64 = {}", kv.get::<f64>("float64"));
    println!("string = {}", kv.get_string("string").unwrap_or_default());
    let bytes = kv.get_bytes("bytes").unwrap_or_default();
    println!("bytes = {}", String::from_utf8_lossy(&bytes));
}

fn remove_some(kv: &Kv) {
    println!("contains \"bool\"? {}", kv.contains("bool"));
    kv.remove("bool");
    println!("after remove, contains \"bool\"? {}", kv.contains("bool"));
    kv.remove_keys(&["int32", "int64"]);
}

/// Opens `id` with `key`, writes the sample values unless `read_only`, and
/// prints what the store holds.
fn exercise(id: &str, key: &str, read_only: bool) -> kvbridge::Result<Kv> {
    let mut options = OpenOptions::new(id).mode(Mode::SingleProcess);
    if !key.is_empty() {
        options = options.crypt_key(key);
    }
    let kv = kvbridge::open(&options)?;
    if !read_only {
        fill(&kv);
    }
    print_values(&kv);
    remove_some(&kv);
    println!("all keys: {:?}", kv.all_keys());
    Ok(kv)
}

fn rekey() -> kvbridge::Result<()> {
    const ID: &str = "rekey_demo";
    let kv = exercise(ID, "", false)?;

    for key in ["Key_seq_1", "Key_seq_2", ""] {
        let next = (!key.is_empty()).then_some(key.as_bytes());
        println!("rekey to {key:?}: {}", kv.rekey(next));
        kv.clear_memory_cache();
        exercise(ID, key, true)?;
    }
    Ok(())
}

fn backup(dir: &Path) -> kvbridge::Result<()> {
    const ID: &str = "demo/Encrypt";
    const KEY: &str = "cryptKey";
    exercise(ID, KEY, false)?;

    let ok = kvbridge::backup_one(ID, dir, None).is_ok();
    println!("backup one return: {ok}");
    println!("backup all count: {}", kvbridge::backup_all(dir, None)?);

    let kv = kvbridge::open(&OpenOptions::new(ID).crypt_key(KEY))?;
    kv.set_string("test_restore_key", "string value before restore");
    println!("before restore [{}] all keys: {:?}", kv.mmap_id(), kv.all_keys());

    let ok = kvbridge::restore_one(ID, dir, None).is_ok();
    println!("restore one return: {ok}");
    if ok {
        println!("after restore [{}] all keys: {:?}", kv.mmap_id(), kv.all_keys());
    }

    let count = kvbridge::restore_all(dir, None)?;
    println!("restore all count: {count}");
    if count > 0 {
        for check in [kv, kvbridge::open(&OpenOptions::new("rekey_demo"))?, kvbridge::default_kv()?] {
            println!("check on restore [{}] all keys: {:?}", check.mmap_id(), check.all_keys());
        }
    }
    Ok(())
}

fn expire() -> kvbridge::Result<()> {
    let kv = kvbridge::open(&OpenOptions::new("expire_demo"))?;
    kv.clear_all();
    kv.trim();
    kv.disable_auto_expire();

    kv.set("auto_expire_key_1", true);
    kv.enable_auto_expire(1);
    kv.set_with_expire("never_expire_key_1", true, 0);

    thread::sleep(Duration::from_secs(2));
    println!("contains auto_expire_key_1: {}", kv.contains("auto_expire_key_1"));
    println!("contains never_expire_key_1: {}", kv.contains("never_expire_key_1"));

    kv.remove("never_expire_key_1");
    kv.enable_auto_expire(0);
    kv.set("never_expire_key_1", true);
    kv.set_with_expire("auto_expire_key_1", true, 1);

    thread::sleep(Duration::from_secs(2));
    println!("contains never_expire_key_1: {}", kv.contains("never_expire_key_1"));
    println!("contains auto_expire_key_1: {}", kv.contains("auto_expire_key_1"));
    Ok(())
}
