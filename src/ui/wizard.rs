use anyhow::{bail, Result};
use colored::*;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use std::path::{Path, PathBuf};

/// Main-file extensions offered as a hint in the picker.
const SCRIPT_HINT: &str = "atsb py ps1 vb vbs bas cls frm cmd bat sh psm1 psd1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionMode {
    MainFile,
    Folder,
}

#[derive(Debug, Clone)]
pub struct WizardSelection {
    pub mode: CollectionMode,
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Interactive picker used when no subcommand is given.
pub struct ModeWizard {
    theme: ColorfulTheme,
}

impl ModeWizard {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }

    pub fn run(&self) -> Result<WizardSelection> {
        println!("\n{}", "Combine text files".bold().blue());
        println!("{}", "==================".blue());

        let mode = match Select::with_theme(&self.theme)
            .with_prompt("What should be combined?")
            .items(&[
                "A main script file and the files it references",
                "Every text file under a folder",
            ])
            .default(0)
            .interact()?
        {
            0 => CollectionMode::MainFile,
            _ => CollectionMode::Folder,
        };

        let input = match mode {
            CollectionMode::MainFile => {
                println!("  {}", format!("Script types: {SCRIPT_HINT}").dimmed());
                self.ask_path("Main script file")?
            }
            CollectionMode::Folder => self.ask_path("Root folder to scan")?,
        };

        match mode {
            CollectionMode::MainFile if !input.is_file() => {
                bail!("{} is not a file", input.display())
            }
            CollectionMode::Folder if !input.is_dir() => {
                bail!("{} is not a folder", input.display())
            }
            _ => {}
        }

        let suggested = default_output(mode, &input);
        let output: String = Input::with_theme(&self.theme)
            .with_prompt("Save combined file as")
            .default(suggested.display().to_string())
            .interact_text()?;

        Ok(WizardSelection {
            mode,
            input,
            output: PathBuf::from(output),
        })
    }

    fn ask_path(&self, prompt: &str) -> Result<PathBuf> {
        let path: String = Input::with_theme(&self.theme)
            .with_prompt(prompt)
            .interact_text()?;
        Ok(PathBuf::from(path.trim()))
    }
}

impl Default for ModeWizard {
    fn default() -> Self {
        Self::new()
    }
}

/// `<stem>.txt` for a main file, `combined.txt` for a folder.
///
/// A main file that already ends in `.txt` gets `<stem>_combined.txt` so the
/// dump never overwrites its own input.
pub fn default_output(mode: CollectionMode, input: &Path) -> PathBuf {
    match mode {
        CollectionMode::Folder => PathBuf::from("combined.txt"),
        CollectionMode::MainFile => {
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "combined".to_string());
            let name = PathBuf::from(format!("{stem}.txt"));
            if input.file_name() == name.file_name() {
                PathBuf::from(format!("{stem}_combined.txt"))
            } else {
                name
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output() {
        assert_eq!(default_output(CollectionMode::MainFile, Path::new("/x/run.ps1")), PathBuf::from("run.txt"));
        assert_eq!(
            default_output(CollectionMode::MainFile, Path::new("notes.txt")),
            PathBuf::from("notes_combined.txt")
        );
        assert_eq!(default_output(CollectionMode::Folder, Path::new("/src")), PathBuf::from("combined.txt"));
    }
}
