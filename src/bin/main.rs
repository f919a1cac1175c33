//! This is the main entry point for the FAT volume console.
//!
//! The program provides an interactive command-line interface for browsing FAT12/16/32 disk
//! images. Users can open an image, walk its directories, print files and dump the volume
//! structures.
//!
//! Passing `-v` (repeatable) on the command line raises the log verbosity.

use fat_recovery::commands::{Command, HELP};
use fat_recovery::filesystem::directory::Directory;
use fat_recovery::filesystem::fat_error::FATError;
use fat_recovery::filesystem::file::File as FatFile;
use fat_recovery::storage::host::HostStorage;
use fat_recovery::traits::{LayoutDisplay, TreeDisplay};
use fat_recovery::{FATVol, ImageStorage};
use log::{error, info, warn};
use std::{
    env,
    fs::File,
    io::{self, Write},
    path::Path,
    rc::Rc,
};

type ImageVol = FATVol<ImageStorage<File>>;

/// Represents the runtime state of the program.
///
/// This struct keeps track of the mounted volume and the directory the user is in.
struct RunState {
    /// The currently mounted volume.
    vol: Option<ImageVol>,
    /// The current directory of the mounted volume.
    cwd: Option<Rc<Directory>>,
    /// Enable the validation of the bpb
    bpb_validation: bool,
}

fn main() {
    let verbosity = env::args()
        .skip(1)
        .filter(|arg| arg.starts_with("-v"))
        .map(|arg| arg.chars().filter(|c| *c == 'v').count())
        .sum::<usize>();

    if let Err(err) = stderrlog::new()
        .module(module_path!())
        .module("fat_recovery")
        .verbosity(verbosity + 1)
        .init()
    {
        eprintln!("Failed to initialize logging: {err}");
    }

    let mut run_state = RunState {
        vol: None,
        cwd: None,
        bpb_validation: true,
    };

    loop {
        print!("> ");
        if let Err(err) = io::stdout().flush() {
            error!("{err}");
            break;
        }

        let mut s = String::new();
        match io::stdin().read_line(&mut s) {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                error!("Failed to read command: {err}");
                break;
            }
        }

        match Command::from_string(&s) {
            Command::Open(path) => open(&mut run_state, Path::new(&path)),
            Command::Close => close(&mut run_state),
            Command::Quit => break,
            Command::Info => match &run_state.vol {
                Some(vol) => print!("{}", vol.boot_sector()),
                None => warn!("Open disk image first"),
            },
            Command::Layout => match &run_state.vol {
                Some(vol) => match vol.display_layout(3) {
                    Ok(layout) => print!("{layout}"),
                    Err(err) => error!("Print layout error: {err}"),
                },
                None => warn!("Open disk image first"),
            },
            Command::Tree => match run_state.vol.as_mut() {
                Some(vol) => match vol.display_tree() {
                    Ok(tree) => print!("{tree}"),
                    Err(err) => error!("Tree printing failed: {err}"),
                },
                None => warn!("Open disk image first"),
            },
            Command::Ls => match &run_state.cwd {
                Some(cwd) => {
                    for entry in cwd.entries() {
                        println!("{entry}");
                    }
                }
                None => warn!("Open disk image first"),
            },
            Command::Cd(name) => {
                if let Err(err) = change_dir(&mut run_state, name.as_deref()) {
                    error!("{err}");
                }
            }
            Command::Pwd => match &run_state.cwd {
                Some(cwd) => println!("{}", cwd.path()),
                None => warn!("Open disk image first"),
            },
            Command::Cat(name) => {
                if let Err(err) = cat(&mut run_state, &name) {
                    error!("{err}");
                }
            }
            Command::Skip => {
                run_state.bpb_validation = false;
                info!("Boot sector validation disabled");
            }
            Command::Help => println!("{HELP}"),
            Command::Unknown(s) => error!("Unknown command: {s:?}"),
            Command::Invalid(s) => error!("{s}"),
            Command::Empty => {}
        }
    }

    close(&mut run_state);
}

/// Mounts the volume stored in `path` and moves to its root directory.
fn open(run_state: &mut RunState, path: &Path) {
    close(run_state);

    let mounted = FATVol::from_file(path, run_state.bpb_validation).and_then(|mut vol| {
        let root = vol.root_dir()?;
        Ok((vol, root))
    });

    match mounted {
        Ok((vol, root)) => {
            info!(
                "Mounted {} volume {:?}",
                vol.fat_type(),
                vol.volume_label()
            );
            run_state.vol = Some(vol);
            run_state.cwd = Some(root);
        }
        Err(err) => error!("{err}"),
    }
}

fn close(run_state: &mut RunState) {
    run_state.cwd = None;
    if let Some(vol) = run_state.vol.take() {
        if let Err(err) = vol.unmount() {
            error!("{err}");
        }
    }
}

/// Changes the current directory. `None` goes back to the root directory.
fn change_dir(run_state: &mut RunState, name: Option<&str>) -> Result<(), FATError> {
    let (Some(vol), Some(cwd)) = (run_state.vol.as_mut(), run_state.cwd.as_ref()) else {
        warn!("Open disk image first");
        return Ok(());
    };

    let next = match name {
        None | Some("/") => vol.root_dir()?,
        Some("..") if cwd.is_root() => {
            warn!("Already at the root directory");
            return Ok(());
        }
        Some(name) => {
            let entry = cwd
                .find(name)
                .ok_or_else(|| FATError::FileNotFound(name.to_string()))?
                .clone();
            vol.open_dir(cwd, &entry)?
        }
    };

    run_state.cwd = Some(next);
    Ok(())
}

/// Streams the content of a file of the current directory to stdout.
fn cat(run_state: &mut RunState, name: &str) -> Result<(), FATError> {
    let (Some(vol), Some(cwd)) = (run_state.vol.as_mut(), run_state.cwd.as_ref()) else {
        warn!("Open disk image first");
        return Ok(());
    };

    let entry = cwd
        .find(name)
        .ok_or_else(|| FATError::FileNotFound(name.to_string()))?
        .clone();
    let mut file = vol.open_file(cwd, &entry)?;

    stream_file(vol, &mut file, name, &mut io::stdout().lock())?;
    Ok(())
}

/// Copies `file` to `out` chunk by chunk and ends the line.
///
/// Write failures are logged and stop the copy. Returns `false` when the output is
/// incomplete.
fn stream_file<S: HostStorage, W: Write>(
    vol: &mut FATVol<S>,
    file: &mut FatFile,
    name: &str,
    out: &mut W,
) -> Result<bool, FATError> {
    while let Some(chunk) = vol.read_chunk(file)? {
        if let Err(err) = out.write_all(&chunk) {
            error!("Failed to write {name}: {err}");
            return Ok(false);
        }
    }
    if let Err(err) = writeln!(out) {
        error!("Failed to write {name}: {err}");
        return Ok(false);
    }

    Ok(true)
}
