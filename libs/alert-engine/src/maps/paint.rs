//! Marks alerting areas on the SVG map template
//!
//! Area shapes carry a `data-oblast="<area>"` attribute. For every alerting
//! area the shape's `fill` becomes red and its `fill-opacity` 0.4, whichever
//! order the attributes appear in.

use crate::error::{AlertError, Result};
use regex::bytes::Regex;

pub const ALERT_FILL: &str = "rgba(230,25,25,1)";
pub const ALERT_FILL_OPACITY: &str = "0.4";

/// Return a copy of `svg` with every area in `areas` recolored
pub fn paint_areas<'a, I>(svg: &[u8], areas: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut painted = svg.to_vec();

    for area in areas {
        let area = regex::escape(area);
        for (attribute, value) in [("fill", ALERT_FILL), ("fill-opacity", ALERT_FILL_OPACITY)] {
            // attribute before the area marker
            let before = compile(&format!(
                r#"(<[^>]+\s{attribute}=)"[^"]*"([^>]+data-oblast="{area}")"#
            ))?;
            painted = before
                .replace_all(&painted, format!(r#"${{1}}"{value}"${{2}}"#).as_bytes())
                .into_owned();

            // attribute after the area marker
            let after = compile(&format!(
                r#"(<[^>]+data-oblast="{area}"[^>]*\s{attribute}=)"[^"]*""#
            ))?;
            painted = after
                .replace_all(&painted, format!(r#"${{1}}"{value}""#).as_bytes())
                .into_owned();
        }
    }

    Ok(painted)
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| AlertError::Render(format!("invalid paint pattern: {}", e)))
}
