//! Output locations: `{results_dir}/{set_name}/{case_id}/{output_file}.{format}`.

use std::fs;
use std::path::{Path, PathBuf};

use diags_common::DiagsResult;
use renderer::{normalize_format, Figure, OutputFormat, PageRect};
use tracing::{debug, info};

use crate::parameter::PlotParameters;

/// Directory for a set's figures, created if missing.
pub fn output_dir(set_name: &str, params: &PlotParameters) -> DiagsResult<PathBuf> {
    let dir = params.results_dir.join(set_name).join(&params.case_id);
    if !dir.exists() {
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "Created output directory");
    }
    if params.print_statements {
        info!("Output dir: {}", dir.display());
    }
    Ok(dir)
}

/// Path of the figure without its extension.
pub fn file_stem(set_name: &str, params: &PlotParameters) -> DiagsResult<PathBuf> {
    Ok(output_dir(set_name, params)?.join(&params.output_file))
}

/// `{stem}.{format}` with the format lowercased and reduced to its last
/// dotted component, so "PNG" and "fig.png" both give `.png`.
pub fn output_path(stem: &Path, format: &str) -> PathBuf {
    with_suffix(stem, &normalize_format(format))
}

/// Path of panel `index` saved on its own: `{stem}.{index}.{format}`.
pub fn subplot_path(stem: &Path, index: usize, format: &str) -> PathBuf {
    with_suffix(stem, &format!("{}.{}", index, normalize_format(format)))
}

/// Save `figure` once per entry of `formats` as `{stem}.{format}`.
///
/// Every format is checked before anything is written.
pub fn save_figure(figure: &Figure, stem: &Path, formats: &[String]) -> DiagsResult<Vec<PathBuf>> {
    let parsed = parse_formats(formats)?;
    let mut paths = Vec::with_capacity(parsed.len());
    for (name, format) in parsed {
        let path = output_path(stem, &name);
        figure.save(&path, format)?;
        info!("Plot saved in: {}", path.display());
        paths.push(path);
    }
    Ok(paths)
}

/// Save each of `rects` cropped out of `figure` as `{stem}.{i}.{format}`.
pub fn save_subplots(
    figure: &Figure,
    stem: &Path,
    rects: &[PageRect],
    formats: &[String],
) -> DiagsResult<Vec<PathBuf>> {
    let parsed = parse_formats(formats)?;
    let mut paths = Vec::with_capacity(parsed.len() * rects.len());
    for (name, format) in &parsed {
        for (i, rect) in rects.iter().enumerate() {
            let sub = figure.crop(*rect)?;
            let path = subplot_path(stem, i, name);
            sub.save(&path, *format)?;
            info!("Sub-plot saved in: {}", path.display());
            paths.push(path);
        }
    }
    Ok(paths)
}

fn parse_formats(formats: &[String]) -> DiagsResult<Vec<(String, OutputFormat)>> {
    formats
        .iter()
        .map(|f| Ok((normalize_format(f), OutputFormat::parse(f)?)))
        .collect()
}

// Appends instead of Path::with_extension so dotted output_file names survive.
fn with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut name = stem.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_keeps_dots_in_stem() {
        let stem = Path::new("/tmp/out/TS.ann");
        assert_eq!(output_path(stem, "PNG"), PathBuf::from("/tmp/out/TS.ann.png"));
        assert_eq!(subplot_path(stem, 2, "x.jpeg"), PathBuf::from("/tmp/out/TS.ann.2.jpeg"));
    }
}
