//! Parser for the CDL text that `ncdump` prints.
//!
//! Only the parts needed to rebuild numeric fields are kept: dimensions,
//! variable declarations, attributes and numeric data sections. Character
//! data is skipped.

use crate::error::{NetCdfError, NetCdfResult};

/// Value of a variable or global attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    Numbers(Vec<f64>),
}

impl AttrValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            AttrValue::Numbers(_) => None,
        }
    }

    /// First value of a numeric attribute.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttrValue::Numbers(v) => v.first().copied(),
            AttrValue::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CdlDimension {
    pub name: String,
    pub len: usize,
    pub unlimited: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CdlVariable {
    pub name: String,
    pub dtype: String,
    pub dimensions: Vec<String>,
    pub attributes: Vec<(String, AttrValue)>,
    /// Values from the `data:` section; `None` entries are `_` fill markers.
    pub data: Option<Vec<Option<f64>>>,
}

impl CdlVariable {
    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CdlDataset {
    pub name: String,
    pub dimensions: Vec<CdlDimension>,
    pub variables: Vec<CdlVariable>,
    pub global_attributes: Vec<(String, AttrValue)>,
}

impl CdlDataset {
    pub fn dimension(&self, name: &str) -> Option<&CdlDimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn variable(&self, name: &str) -> Option<&CdlVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Dimensions of `name` that have a coordinate variable of the same name.
    pub fn coordinate_names(&self, name: &str) -> Vec<String> {
        self.variable(name)
            .map(|v| {
                v.dimensions
                    .iter()
                    .filter(|d| self.variable(d).is_some())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn variable_mut(&mut self, name: &str) -> Option<&mut CdlVariable> {
        self.variables.iter_mut().find(|v| v.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Preamble,
    Dimensions,
    Variables,
    Data,
}

/// Parse a full `ncdump` listing (header only or with data).
pub fn parse(text: &str) -> NetCdfResult<CdlDataset> {
    let mut dataset = CdlDataset::default();
    let mut section = Section::Preamble;
    let mut pending = String::new();

    for line in text.lines() {
        let (code, comment) = split_comment(line);
        let trimmed = code.trim();

        if pending.trim().is_empty() {
            match trimmed {
                "dimensions:" => {
                    section = Section::Dimensions;
                    continue;
                }
                "variables:" => {
                    section = Section::Variables;
                    continue;
                }
                "data:" => {
                    section = Section::Data;
                    continue;
                }
                "}" => break,
                _ => {}
            }
            if let Some(rest) = trimmed.strip_prefix("netcdf ") {
                dataset.name = rest.trim_end_matches('{').trim().to_string();
                continue;
            }
            // Section headings such as "// global attributes:" live in comments.
            if trimmed.is_empty() {
                continue;
            }
        }

        let mut rest = code;
        while let Some(end) = find_unquoted(rest, ';') {
            pending.push_str(&rest[..end]);
            let statement = std::mem::take(&mut pending);
            handle_statement(&mut dataset, section, statement.trim(), comment)?;
            rest = &rest[end + 1..];
        }
        pending.push_str(rest);
        pending.push(' ');
    }

    if !pending.trim().is_empty() {
        return Err(NetCdfError::InvalidFormat(format!(
            "unterminated CDL statement: '{}'",
            pending.trim()
        )));
    }

    Ok(dataset)
}

fn handle_statement(
    dataset: &mut CdlDataset,
    section: Section,
    statement: &str,
    comment: Option<&str>,
) -> NetCdfResult<()> {
    if statement.is_empty() {
        return Ok(());
    }
    match section {
        Section::Preamble => Err(NetCdfError::InvalidFormat(format!(
            "statement outside of any section: '{}'",
            statement
        ))),
        Section::Dimensions => {
            for decl in split_unquoted(statement, ',') {
                dataset.dimensions.push(parse_dimension(decl.trim(), comment)?);
            }
            Ok(())
        }
        Section::Variables => {
            let is_attribute = find_unquoted(statement, '=')
                .map(|eq| statement[..eq].contains(':'))
                .unwrap_or(false);
            if is_attribute {
                parse_attribute(dataset, statement)
            } else {
                dataset.variables.push(parse_declaration(statement)?);
                Ok(())
            }
        }
        Section::Data => parse_data(dataset, statement),
    }
}

fn parse_dimension(decl: &str, comment: Option<&str>) -> NetCdfResult<CdlDimension> {
    let (name, value) = decl
        .split_once('=')
        .ok_or_else(|| NetCdfError::InvalidFormat(format!("bad dimension '{}'", decl)))?;
    let name = name.trim().to_string();
    let value = value.trim();

    if value.eq_ignore_ascii_case("UNLIMITED") {
        // ncdump reports the current length as "// (12 currently)"
        let len = comment
            .and_then(|c| c.trim().strip_prefix('('))
            .and_then(|c| c.split_whitespace().next())
            .and_then(|n| n.parse().ok())
            .unwrap_or(0);
        return Ok(CdlDimension {
            name,
            len,
            unlimited: true,
        });
    }

    let len = value.parse().map_err(|_| {
        NetCdfError::InvalidFormat(format!("Failed to parse dimension {}: '{}'", name, value))
    })?;
    Ok(CdlDimension {
        name,
        len,
        unlimited: false,
    })
}

fn parse_declaration(statement: &str) -> NetCdfResult<CdlVariable> {
    let (dtype, rest) = statement
        .split_once(char::is_whitespace)
        .ok_or_else(|| NetCdfError::InvalidFormat(format!("bad declaration '{}'", statement)))?;
    let rest = rest.trim();

    let (name, dimensions) = match rest.split_once('(') {
        Some((name, dims)) => {
            let dims = dims.trim_end().trim_end_matches(')');
            let dims = dims
                .split(',')
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .collect();
            (name.trim().to_string(), dims)
        }
        None => (rest.to_string(), Vec::new()),
    };

    Ok(CdlVariable {
        name,
        dtype: dtype.to_string(),
        dimensions,
        attributes: Vec::new(),
        data: None,
    })
}

fn parse_attribute(dataset: &mut CdlDataset, statement: &str) -> NetCdfResult<()> {
    let eq = find_unquoted(statement, '=')
        .ok_or_else(|| NetCdfError::InvalidFormat(format!("bad attribute '{}'", statement)))?;
    let (target, name) = statement[..eq]
        .trim()
        .split_once(':')
        .ok_or_else(|| NetCdfError::InvalidFormat(format!("bad attribute '{}'", statement)))?;
    // A leading type keyword ("string units") only appears in netCDF-4 listings.
    let target = target.split_whitespace().last().unwrap_or("");
    let value = parse_attr_value(statement[eq + 1..].trim())?;
    let name = name.trim().to_string();

    if target.is_empty() {
        dataset.global_attributes.push((name, value));
        return Ok(());
    }
    let variable = dataset.variable_mut(target).ok_or_else(|| {
        NetCdfError::InvalidFormat(format!("attribute for undeclared variable '{}'", target))
    })?;
    variable.attributes.push((name, value));
    Ok(())
}

fn parse_attr_value(raw: &str) -> NetCdfResult<AttrValue> {
    if raw.starts_with('"') {
        let mut text = String::new();
        for piece in split_unquoted(raw, ',') {
            text.push_str(&unquote(piece.trim()));
        }
        return Ok(AttrValue::Text(text));
    }

    let numbers = split_unquoted(raw, ',')
        .into_iter()
        .map(|token| {
            parse_number(token).ok_or_else(|| {
                let message = format!("bad numeric attribute value '{}'", token.trim());
                NetCdfError::InvalidFormat(message)
            })
        })
        .collect::<NetCdfResult<Vec<f64>>>()?;
    Ok(AttrValue::Numbers(numbers))
}

fn parse_data(dataset: &mut CdlDataset, statement: &str) -> NetCdfResult<()> {
    let (name, values) = statement
        .split_once('=')
        .ok_or_else(|| NetCdfError::InvalidFormat(format!("bad data statement '{}'", statement)))?;
    let name = name.trim();
    let variable = dataset.variable_mut(name).ok_or_else(|| {
        NetCdfError::InvalidFormat(format!("data for undeclared variable '{}'", name))
    })?;

    if values.trim_start().starts_with('"') {
        return Ok(());
    }

    let mut data = Vec::new();
    for token in values.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if token == "_" {
            data.push(None);
            continue;
        }
        let value = parse_number(token).ok_or_else(|| {
            NetCdfError::InvalidFormat(format!("bad value '{}' in variable {}", token, name))
        })?;
        data.push(Some(value));
    }
    variable.data = Some(data);
    Ok(())
}

/// Parse a CDL numeric literal, dropping type suffixes (`1.5f`, `3s`, `7UB`).
pub fn parse_number(token: &str) -> Option<f64> {
    let token = token.trim();
    let stripped = token.trim_end_matches(|c: char| {
        matches!(c, 'f' | 'F' | 's' | 'S' | 'b' | 'B' | 'l' | 'L' | 'u' | 'U' | 'd' | 'D')
    });
    let stripped = if stripped.is_empty() { token } else { stripped };
    stripped.parse::<f64>().ok()
}

fn unquote(s: &str) -> String {
    let inner = s
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s);
    inner
        .replace("\\n", "\n")
        .replace("\\t", "\t")
        .replace("\\\"", "\"")
        .replace("\\\\", "\\")
}

/// Split off a trailing `//` comment that is not inside a string.
fn split_comment(line: &str) -> (&str, Option<&str>) {
    let bytes = line.as_bytes();
    let mut in_quotes = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if in_quotes => i += 1,
            b'"' => in_quotes = !in_quotes,
            b'/' if !in_quotes && bytes.get(i + 1) == Some(&b'/') => {
                return (&line[..i], Some(&line[i + 2..]));
            }
            _ => {}
        }
        i += 1;
    }
    (line, None)
}

fn find_unquoted(s: &str, needle: char) -> Option<usize> {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == needle && !in_quotes => return Some(i),
            _ => {}
        }
    }
    None
}

fn split_unquoted(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = s;
    while let Some(idx) = find_unquoted(rest, sep) {
        parts.push(&rest[..idx]);
        rest = &rest[idx + sep.len_utf8()..];
    }
    parts.push(rest);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = r#"netcdf TS_ANN_climo {
dimensions:
	time = UNLIMITED ; // (1 currently)
	lat = 2 ;
	lon = 3 ;
variables:
	double time(time) ;
		time:units = "days since 0001-01-01" ;
	double lat(lat) ;
		lat:units = "degrees_north" ;
	double lon(lon) ;
		lon:units = "degrees_east" ;
	float TS(time, lat, lon) ;
		TS:units = "K" ;
		TS:long_name = "Surface temperature (radiative)" ;
		TS:_FillValue = 1.e+20f ;

// global attributes:
		:title = "ANN climatology; model output" ;
}
"#;

    #[test]
    fn test_parse_header() {
        let ds = parse(HEADER).unwrap();
        assert_eq!(ds.name, "TS_ANN_climo");
        assert_eq!(
            ds.dimension("time"),
            Some(&CdlDimension {
                name: "time".into(),
                len: 1,
                unlimited: true
            })
        );
        assert_eq!(ds.dimension("lon").unwrap().len, 3);

        let ts = ds.variable("TS").unwrap();
        assert_eq!(ts.dtype, "float");
        assert_eq!(ts.dimensions, vec!["time", "lat", "lon"]);
        assert_eq!(ts.attribute("units").and_then(|a| a.as_text()), Some("K"));
        assert_eq!(ts.attribute("_FillValue").and_then(|a| a.as_number()), Some(1e20));
        assert!(ts.data.is_none());

        assert_eq!(
            ds.global_attributes[0],
            ("title".to_string(), AttrValue::Text("ANN climatology; model output".into()))
        );
        assert_eq!(ds.coordinate_names("TS"), vec!["time", "lat", "lon"]);
    }

    #[test]
    fn test_parse_multiline_data_with_fill() {
        let text = r#"netcdf x {
dimensions:
	n = 5 ;
variables:
	short v(n) ;
data:

 v = 1, 2,
    _, 4,
    5 ;
}
"#;
        let ds = parse(text).unwrap();
        assert_eq!(
            ds.variable("v").unwrap().data,
            Some(vec![Some(1.0), Some(2.0), None, Some(4.0), Some(5.0)])
        );
    }

    #[test]
    fn test_parse_number_suffixes() {
        assert_eq!(parse_number("1.5f"), Some(1.5));
        assert_eq!(parse_number("-3s"), Some(-3.0));
        assert_eq!(parse_number("7UB"), Some(7.0));
        assert_eq!(parse_number("1.e+20f"), Some(1e20));
        assert_eq!(parse_number("270."), Some(270.0));
        assert!(parse_number("NaNf").unwrap().is_nan());
        assert_eq!(parse_number("abc"), None);
    }

    #[test]
    fn test_comment_inside_string_is_kept() {
        let (code, comment) = split_comment(r#"  :url = "http://example.org" ; // note"#);
        assert_eq!(code, r#"  :url = "http://example.org" ; "#);
        assert_eq!(comment, Some(" note"));
    }

    #[test]
    fn test_unterminated_statement_is_an_error() {
        let text = "netcdf x {\ndimensions:\n\tn = 2\n";
        assert!(matches!(parse(text), Err(NetCdfError::InvalidFormat(_))));
    }
}
