use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use fotoscan::{load_classifiers, PageRecord, PageScanner, ScanError};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "fotoscan")]
#[command(about = "Detects, extracts and straightens the photos on scanned album pages", long_about = None)]
struct Cli {
    /// Page images or directories to scan (directories are walked recursively)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory for extracted photos, mirroring the input layout
    #[arg(short, long)]
    output: PathBuf,

    /// Cascade model file for orientation voting; repeatable, list the most
    /// specific model first (e.g. frontal faces before profiles)
    #[arg(short, long = "classifier")]
    classifiers: Vec<PathBuf>,

    /// Re-run detection even when a saved .dat record exists
    #[arg(long)]
    force: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    // All classifiers load up front; a missing model aborts the run instead
    // of silently skewing the orientation votes.
    let mut classifiers = load_classifiers(&cli.classifiers)?;

    let mut pages: Vec<(PathBuf, PathBuf)> = Vec::new();
    for input in &cli.inputs {
        collect_pages(input, input, &mut pages)?;
    }
    info!(pages = pages.len(), "scanning");

    let scanner = PageScanner::new();
    let mut failures = 0usize;
    for (page, relative) in &pages {
        match process_page(&scanner, page, relative, &cli, &mut classifiers) {
            Ok(count) => info!(page = %page.display(), photos = count, "page done"),
            Err(e) => {
                failures += 1;
                error!(page = %page.display(), error = %e, "page failed");
            }
        }
    }

    if failures > 0 {
        warn!(failures, "some pages failed");
    }
    Ok(())
}

/// Recursively gather page images, remembering each path relative to the
/// input root so the output directory mirrors the input layout.
fn collect_pages(
    root: &Path,
    path: &Path,
    pages: &mut Vec<(PathBuf, PathBuf)>,
) -> Result<(), ScanError> {
    if path.is_dir() {
        let mut entries: Vec<PathBuf> = fs::read_dir(path)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|e| e.path())
            .collect();
        entries.sort();
        for entry in entries {
            collect_pages(root, &entry, pages)?;
        }
        return Ok(());
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    if matches!(ext.as_deref(), Some("jpg" | "jpeg" | "png")) {
        let relative = match path.strip_prefix(root) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
            _ => PathBuf::from(path.file_name().unwrap_or_default()),
        };
        pages.push((path.to_path_buf(), relative));
    }
    Ok(())
}

/// Process one page end to end. Returns the number of photos written.
fn process_page(
    scanner: &PageScanner,
    page: &Path,
    relative: &Path,
    cli: &Cli,
    classifiers: &mut [Box<dyn fotoscan::FeatureClassifier>],
) -> Result<usize, ScanError> {
    let image = scanner.load_page(page)?;

    // A .dat record next to the page holds reviewed boundaries; it wins over
    // fresh detection so hand edits survive re-runs.
    let record_path = page.with_extension("dat");
    let pictures = if record_path.is_file() && !cli.force {
        let record: PageRecord = serde_json::from_str(&fs::read_to_string(&record_path)?)?;
        info!(page = %page.display(), "using saved boundaries");
        record.to_shapes()
    } else {
        let detection = scanner.detect(&image);
        let record = PageRecord::from_shapes(&detection.pictures);
        fs::write(&record_path, serde_json::to_string(&record)?)?;
        detection.pictures
    };

    let mut photos = Vec::new();
    let mut indices = Vec::new();
    for (i, result) in scanner.extract(&image, &pictures).into_iter().enumerate() {
        match result {
            Ok(photo) => {
                photos.push(photo);
                indices.push(i);
            }
            Err(e) => warn!(page = %page.display(), picture = i, error = %e, "skipped"),
        }
    }

    if !classifiers.is_empty() {
        scanner.correct_page(&mut photos, classifiers);
    }

    let stem = relative.file_stem().unwrap_or_default().to_os_string();
    let ext = page.extension().and_then(|e| e.to_str()).unwrap_or("png");
    let out_dir = match relative.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => cli.output.join(parent),
        _ => cli.output.clone(),
    };
    fs::create_dir_all(&out_dir)?;

    for (photo, &index) in photos.iter().zip(indices.iter()) {
        let mut name = stem.clone();
        name.push(format!("_{index}.{ext}"));
        let out_path = out_dir.join(&name);
        photo.save(&out_path).map_err(|source| ScanError::Image {
            path: out_path.clone(),
            source,
        })?;
    }
    Ok(photos.len())
}
