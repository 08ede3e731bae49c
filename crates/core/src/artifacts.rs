//! Result files produced by the worker.
//!
//! Plots and videos are listed from the flat plots directory and given a
//! display title derived from their file name. Training sets, trained models
//! and finished simulations are listed from the data directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::{debug, info};

use crate::error::{Error, Result};

pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];
pub const VIDEO_EXTENSIONS: [&str; 1] = ["mp4"];
pub const DATA_EXTENSION: &str = "h5";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Image,
    Video,
}

impl ArtifactKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();

        if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            Some(Self::Image)
        } else if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
            Some(Self::Video)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
    pub title: String,
}

impl Artifact {
    pub fn from_path(path: PathBuf) -> Option<Self> {
        let kind = ArtifactKind::from_path(&path)?;
        let title = format_title(&path.to_string_lossy());
        Some(Self { path, kind, title })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactListing {
    pub images: Vec<Artifact>,
    pub videos: Vec<Artifact>,
}

impl ArtifactListing {
    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.videos.is_empty()
    }

    /// Images, then videos.
    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.images.iter().chain(self.videos.iter())
    }

    /// Finds an artifact by its 1-based position in [`iter`](Self::iter) order
    /// or by its title, ignoring case.
    pub fn find(&self, selector: &str) -> Option<&Artifact> {
        let selector = selector.trim();

        if let Ok(position) = selector.parse::<usize>() {
            return position.checked_sub(1).and_then(|index| self.iter().nth(index));
        }

        self.iter()
            .find(|artifact| artifact.title.eq_ignore_ascii_case(selector))
    }
}

/// The desktop's default-application launcher for `path`.
pub fn opener_command(path: &Path) -> Command {
    let mut command = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(windows) {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", ""]);
        command
    } else {
        Command::new("xdg-open")
    };

    command.arg(path);
    command
}

/// Opens `artifact` with the desktop's default application and waits for the
/// launcher to return.
///
/// # Errors
///
/// Returns [`Error::Launch`] if the launcher cannot be run, or
/// [`Error::Open`] if it reports a failure.
pub fn open_artifact(artifact: &Artifact) -> Result<()> {
    let mut command = opener_command(&artifact.path);
    let program = command.get_program().to_string_lossy().into_owned();
    info!("Opening `{}` with {program}", artifact.path.display());

    let status = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| Error::launch_error(program.clone(), e))?;

    if !status.success() {
        return Err(Error::Open {
            program,
            path: artifact.path.display().to_string(),
            code: status.code(),
        });
    }

    Ok(())
}

/// Derives a display title from a result file name.
///
/// Everything up to the last `)` of the stem is dropped, separators become
/// spaces and the words are title cased.
///
/// # Examples
///
/// ```
/// use primme_runner_core::artifacts::format_title;
///
/// assert_eq!(format_title("(3)grain_growth_plot.png"), "Grain Growth Plot");
/// ```
pub fn format_title(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let stem = match stem.rfind(')') {
        Some(index) => &stem[index + 1..],
        None => stem.as_str(),
    };

    title_case(&stem.replace(['_', '-'], " "))
}

/// Upper-cases a letter that follows a non-letter and lower-cases the rest.
fn title_case(text: &str) -> String {
    let mut titled = String::with_capacity(text.len());
    let mut previous_is_letter = false;

    for c in text.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                titled.extend(c.to_lowercase());
            } else {
                titled.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            titled.push(c);
            previous_is_letter = false;
        }
    }

    titled
}

/// Files directly inside `directory`, sorted. A missing directory is empty.
fn list_files(directory: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot list `{}`: {e}", directory.display());
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    files
}

/// Lists plots and videos in the plots directory, grouped by kind.
pub fn scan_artifacts(plots_directory: impl AsRef<Path>) -> ArtifactListing {
    let mut listing = ArtifactListing::default();

    for artifact in list_files(plots_directory.as_ref())
        .into_iter()
        .filter_map(Artifact::from_path)
    {
        match artifact.kind {
            ArtifactKind::Image => listing.images.push(artifact),
            ArtifactKind::Video => listing.videos.push(artifact),
        }
    }

    listing
}

/// Data files available as worker inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataCatalog {
    pub trainsets: Vec<PathBuf>,
    pub models: Vec<PathBuf>,
    pub simulations: Vec<PathBuf>,
}

/// Lists `.h5` files in the data directory by what their name says they hold.
///
/// A file whose name matches several categories is listed in each of them.
pub fn scan_data_files(data_directory: impl AsRef<Path>) -> DataCatalog {
    let mut catalog = DataCatalog::default();

    for path in list_files(data_directory.as_ref()) {
        let is_data = path
            .extension()
            .is_some_and(|extension| extension.eq_ignore_ascii_case(DATA_EXTENSION));
        if !is_data {
            continue;
        }

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        if name.contains("spparks") {
            catalog.trainsets.push(path.clone());
        }
        if name.contains("model") {
            catalog.models.push(path.clone());
        }
        if name.contains("primme") {
            catalog.simulations.push(path);
        }
    }

    catalog
}
