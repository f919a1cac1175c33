//! This module defines the `Command` enum and its associated methods for parsing
//! and handling user commands in the FAT volume console.
//!
//! The `Command` enum represents various commands that the user can input,
//! such as quitting the program, opening an image, listing a directory, or handling
//! invalid or unknown commands.

/// Represents a user command in the FAT volume console.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    /// Command to quit the program.
    Quit,
    /// Command to open a disk image, encapsulating the file path as a `String`.
    Open(String),
    /// Command to close the opened image.
    Close,
    /// Command to print the boot sector fields.
    Info,
    /// Command to print the volume layout.
    Layout,
    /// Command to print the directory tree.
    Tree,
    /// Command to list the current directory.
    Ls,
    /// Command to change directory. `None` goes back to the root directory.
    Cd(Option<String>),
    /// Command to print the current directory.
    Pwd,
    /// Command to print the content of a file.
    Cat(String),
    /// Skip the Bpb validation
    Skip,
    /// Command to list the available commands.
    Help,
    /// Command for an unknown input, encapsulating the raw input as a `String`.
    Unknown(String),
    /// Command for invalid input, encapsulating an error message as a `String`.
    Invalid(String),
    /// Command for an empty input.
    Empty,
}

/// Usage printed by the `help` command.
pub const HELP: &str = "\
open <image>   mount the FAT volume stored in <image>
close          unmount the current volume
info           print the boot sector fields
layout         print the volume regions
tree           print the directory tree
ls             list the current directory
cd [dir]       enter <dir>, `..` for the parent, nothing for the root
pwd            print the current directory
cat <file>     print the content of <file>
skip           disable the boot sector validation for the next `open`
help           print this help
quit           leave the console";

impl Command {
    /// Parses a string into a `Command` instance.
    ///
    /// # Parameters
    /// - `s`: A string slice representing the user input.
    ///
    /// # Returns
    /// - `Command::Open` / `Command::Cat` with their argument. Names may contain spaces:
    ///   the rest of the line is the argument.
    /// - `Command::Cd` with an optional argument.
    /// - `Command::Unknown` if the input does not match any known command.
    /// - `Command::Invalid` if a mandatory argument is missing.
    /// - `Command::Empty` if the input is empty or contains only whitespace.
    pub fn from_string(s: &str) -> Self {
        let s = s.trim();
        let (cmd, arg) = match s.split_once(char::is_whitespace) {
            Some((cmd, arg)) => (cmd, Some(arg.trim().to_string())),
            None => (s, None),
        };

        match cmd {
            "quit" | "exit" => Command::Quit,
            "open" => match arg {
                Some(path) => Command::Open(path),
                None => Command::Invalid(String::from(
                    "Missing arg: 'open' expects the path to a '.img' file.",
                )),
            },
            "close" => Command::Close,
            "info" => Command::Info,
            "layout" => Command::Layout,
            "tree" => Command::Tree,
            "ls" => Command::Ls,
            "cd" => Command::Cd(arg),
            "pwd" => Command::Pwd,
            "cat" => match arg {
                Some(name) => Command::Cat(name),
                None => Command::Invalid(String::from(
                    "Missing arg: 'cat' expects the name of a file.",
                )),
            },
            "skip" => Command::Skip,
            "help" => Command::Help,
            "" => Command::Empty,
            other => Command::Unknown(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_without_argument() {
        assert_eq!(Command::from_string("quit\n"), Command::Quit);
        assert_eq!(Command::from_string("  ls  "), Command::Ls);
        assert_eq!(Command::from_string("tree"), Command::Tree);
        assert_eq!(Command::from_string("cd"), Command::Cd(None));
        assert_eq!(Command::from_string(""), Command::Empty);
        assert_eq!(Command::from_string("   \n"), Command::Empty);
    }

    #[test]
    fn arguments_keep_inner_spaces() {
        assert_eq!(
            Command::from_string("cat my notes.txt\n"),
            Command::Cat(String::from("my notes.txt"))
        );
        assert_eq!(
            Command::from_string("cd .."),
            Command::Cd(Some(String::from("..")))
        );
        assert_eq!(
            Command::from_string("open disk.img"),
            Command::Open(String::from("disk.img"))
        );
    }

    #[test]
    fn missing_and_unknown() {
        assert!(matches!(Command::from_string("open"), Command::Invalid(_)));
        assert!(matches!(Command::from_string("cat"), Command::Invalid(_)));
        assert_eq!(
            Command::from_string("format c:"),
            Command::Unknown(String::from("format"))
        );
    }
}
