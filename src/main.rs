#[macro_use]
extern crate failure;

use std::thread;
use std::time::Duration;

use failure::Error;
use log::{info, warn};

use mantis::doc::{Document, EntityData};
use mantis::file_watcher::DirWatcher;
use mantis::stats;
use mantis::storage;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Fail, Debug)]
#[fail(display = "usage: mantis <data-dir> <character>.json [--watch]")]
struct UsageError;

fn print_frame_data(character: &EntityData, document: &Document) {
    println!("{} ({} bones)", character.name, character.hurtbubbles.len());
    for (name, animation) in document.animations_iter() {
        let stats = stats::compute(animation);
        println!(
            "  {:24} duration={:<4} windup={:<4} hits=[{}] backswing={}",
            name, stats.duration, stats.windup, stats.hits, stats.backswing
        );
    }
}

fn run() -> Result<(), Error> {
    let mut args = std::env::args().skip(1);
    let data_dir = args.next().ok_or(UsageError)?;
    let character_file = args.next().ok_or(UsageError)?;
    let watch = args.next().map_or(false, |a| a == "--watch");

    let (mut character, mut document) = storage::load_character(&data_dir, &character_file)?;
    print_frame_data(&character, &document);

    if !watch {
        return Ok(());
    }

    let anim_file = storage::animation_file_name(&character_file);
    let mut watcher = DirWatcher::new(&data_dir)?;
    info!("watching {}", watcher.root().display());

    loop {
        for name in watcher.poll() {
            // Whole-document replacement; a bad edit keeps the previous
            // in-memory state.
            let content = match watcher.get(&name) {
                Some(content) => content,
                None => continue,
            };
            if name == anim_file {
                match storage::parse_document(content) {
                    Ok(reloaded) => {
                        document = reloaded;
                        info!("reloaded {}", name);
                        print_frame_data(&character, &document);
                    }
                    Err(e) => warn!("ignoring unparseable {}: {}", name, e),
                }
            } else if name == character_file {
                match storage::parse_entity(content) {
                    Ok(reloaded) => {
                        character = reloaded;
                        info!("reloaded {}", name);
                        print_frame_data(&character, &document);
                    }
                    Err(e) => warn!("ignoring unparseable {}: {}", name, e),
                }
            }
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn main() -> Result<(), Error> {
    env_logger::init();
    run()
}
