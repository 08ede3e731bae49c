//! Text rendering of result and data listings.

use std::path::PathBuf;

use itertools::Itertools;
use primme_runner_core::artifacts::{Artifact, ArtifactListing, DataCatalog};

fn artifact_lines(
    heading: &str,
    empty: &str,
    artifacts: &[Artifact],
    first_number: usize,
) -> Vec<String> {
    let mut lines = vec![format!("{heading}:")];

    if artifacts.is_empty() {
        lines.push(format!("\t{empty}"));
    } else {
        lines.extend(artifacts.iter().zip(first_number..).map(|(artifact, number)| {
            format!("\t{number}. {}\t{}", artifact.title, artifact.path.display())
        }));
    }

    lines
}

/// Lines describing the plots and videos found.
///
/// Entries are numbered the way `ArtifactListing::find` counts them.
pub fn format_artifacts(listing: &ArtifactListing) -> Vec<String> {
    let mut lines = artifact_lines("Plots", "No plots found", &listing.images, 1);
    lines.extend(artifact_lines(
        "Videos",
        "No videos found",
        &listing.videos,
        listing.images.len() + 1,
    ));
    lines
}

fn path_lines(heading: &str, paths: &[PathBuf]) -> Vec<String> {
    let mut lines = vec![format!("{heading}:")];

    if paths.is_empty() {
        lines.push("\tNone found".to_string());
    } else {
        lines.extend(
            paths
                .iter()
                .map(|path| path.display().to_string())
                .sorted()
                .map(|path| format!("\t{path}")),
        );
    }

    lines
}

/// Lines describing the data files found.
pub fn format_catalog(catalog: &DataCatalog) -> Vec<String> {
    [
        ("Training sets", &catalog.trainsets),
        ("Trained models", &catalog.models),
        ("PRIMME simulations", &catalog.simulations),
    ]
    .into_iter()
    .flat_map(|(heading, paths)| path_lines(heading, paths))
    .collect()
}
