//! Drives a buddy allocator through a short allocate/release scenario and
//! prints the free lists after every step.
//!
//! Usage: `buddy_arena [MIN_ORDER MAX_ORDER]`

#![deny(rust_2018_idioms)]

mod print;

use buddy_arena::{BuddyAllocator, Config, Error, MAX_ORDER, MIN_ORDER};
use std::{env, process};

fn parse_config() -> Result<Config, String> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    let (min, max) = match args.as_slice() {
        [] => (MIN_ORDER, MAX_ORDER),
        [min, max] => (
            min.parse().map_err(|_| format!("invalid minimum order `{}`", min))?,
            max.parse().map_err(|_| format!("invalid maximum order `{}`", max))?,
        ),
        _ => return Err("usage: buddy_arena [MIN_ORDER MAX_ORDER]".into()),
    };

    Config::new(min, max).map_err(|err| err.to_string())
}

/// Allocate a block of a bit more than half a page above the minimum,
/// then one of a bit less than a page, then release both again.
fn run(config: Config) -> Result<(), Error> {
    let mut alloc = BuddyAllocator::new(config);
    let page = config.page_size();

    println!("{}", alloc.dump());

    let a1 = alloc.allocate(page + page / 4)?;
    log::info!("Allocated {} bytes at offset {:?}", a1.len(), alloc.offset_of(a1.cast()));
    println!("{}", alloc.dump());

    let a2 = alloc.allocate(page - page / 4)?;
    log::info!("Allocated {} bytes at offset {:?}", a2.len(), alloc.offset_of(a2.cast()));
    println!("{}", alloc.dump());

    alloc.release(a1.cast())?;
    println!("{}", alloc.dump());

    alloc.release(a2.cast())?;
    println!("{}", alloc.dump());

    // releasing twice must be caught
    match alloc.release(a2.cast()) {
        Err(Error::DoubleFreeOrInvalidAddress) => log::info!("Double release was rejected"),
        other => log::error!("Double release was not rejected: {:?}", other),
    }

    Ok(())
}

fn main() {
    print::init_logging();

    let config = match parse_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            process::exit(2);
        }
    };

    if let Err(err) = run(config) {
        eprintln!("Aborting: {}", err);
        process::exit(1);
    }
}
