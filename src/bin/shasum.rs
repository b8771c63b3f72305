//! Minimal digest wrapper: hashes the files named on the command line, or
//! stdin when none are given, printing one `<digest>  <name>` line each.

use std::env;
use std::fs::File;
use std::io::{self, Read};
use std::process;

use shapipe::Hasher;

fn digest_reader<R: Read>(mut reader: R) -> io::Result<[u8; 32]> {
    let mut hasher = Hasher::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

fn run() -> io::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        let digest = digest_reader(io::stdin().lock())?;
        println!("{}  -", hex::encode(digest));
        return Ok(());
    }
    for name in &args {
        let digest = digest_reader(File::open(name)?)?;
        println!("{}  {}", hex::encode(digest), name);
    }
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("shasum: {}", e);
        process::exit(1);
    }
}
