//! Rendering of prediction results: pLDDT color mapping, the 3-D structure
//! view, the PAE heatmap, and the assembled HTML report.
//!
//! The structure view is emitted as a self-contained HTML fragment driving a
//! 3Dmol.js scene; the heatmap is hand-emitted SVG so the report has no
//! charting dependency.

use polars::prelude::DataFrame;
use rayon::prelude::*;
use std::fmt::Write;

use crate::confidence::{LigandAtomConfidence, PaeMatrix, ResidueConfidenceMap};
use crate::summary::SummaryTables;

/// Very high confidence, pLDDT in [90, 100]
pub const COLOR_VERY_HIGH: &str = "#106dff";
/// Confident, pLDDT in [70, 90)
pub const COLOR_CONFIDENT: &str = "#10cff1";
/// Low confidence, pLDDT in [50, 70)
pub const COLOR_LOW: &str = "#f6ed12";
/// Very low confidence, pLDDT in [0, 50)
pub const COLOR_VERY_LOW: &str = "#ef821e";
/// Fallback for scores outside every listed range
pub const COLOR_DEFAULT: &str = "grey";

/// Upper bound of the PAE color scale. The artifact encodes PAE in 0.25 Å
/// steps capped at this value.
pub const PAE_SCALE_MAX: f32 = 31.75;

/// Map a pLDDT score to its display color.
///
/// Ranges are checked in descending order with inclusive lower bounds; the
/// top range additionally includes 100. Anything outside the listed ranges
/// falls back to [`COLOR_DEFAULT`].
pub fn plddt_color(score: f64) -> &'static str {
    if (90.0..=100.0).contains(&score) {
        COLOR_VERY_HIGH
    } else if (70.0..90.0).contains(&score) {
        COLOR_CONFIDENT
    } else if (50.0..70.0).contains(&score) {
        COLOR_LOW
    } else if (0.0..50.0).contains(&score) {
        COLOR_VERY_LOW
    } else {
        COLOR_DEFAULT
    }
}

/// Indices at which the token chain id differs from its predecessor, i.e.
/// every chain transition. Position 0 is never a boundary.
pub fn chain_boundaries(token_chain_ids: &[String]) -> Vec<usize> {
    token_chain_ids
        .windows(2)
        .enumerate()
        .filter(|(_, w)| w[0] != w[1])
        .map(|(i, _)| i + 1)
        .collect()
}

/// Build the 3-D structure view: the raw mmCIF text loaded into a 3Dmol.js
/// scene with a uniform grey cartoon base, per-residue cartoon colors from
/// the averaged scores, and per-atom stick colors for ligand atoms.
pub fn structure_viewer_html(
    residues: &ResidueConfidenceMap,
    ligands: &[LigandAtomConfidence],
    cif_content: &str,
) -> String {
    let mut styles = String::new();
    for ((chain, resi), info) in residues {
        let color = plddt_color(info.avg_plddt);
        let _ = writeln!(
            styles,
            "viewer.addStyle({{chain: {chain}, resi: {resi}}}, {{cartoon: {{color: {color}}}}});",
            chain = js_str(chain),
            color = js_str(color),
        );
    }
    for ligand in ligands {
        let color = plddt_color(ligand.plddt);
        let _ = writeln!(
            styles,
            "viewer.addStyle({{chain: {chain}, resi: {resi}, atom: {atom}}}, {{stick: {{color: {color}}}}});",
            chain = js_str(&ligand.chain),
            resi = ligand.resi,
            atom = js_str(&ligand.atomn),
            color = js_str(color),
        );
    }

    format!(
        r##"<div id="structure-viewer" style="width: 100%; height: 600px; position: relative;"></div>
<script src="https://3dmol.org/build/3Dmol-min.js"></script>
<script>
const viewer = $3Dmol.createViewer(document.getElementById("structure-viewer"), {{ backgroundColor: "#000000" }});
viewer.addModel({cif}, "cif");
viewer.setStyle({{model: -1}}, {{cartoon: {{color: "grey"}}}});
{styles}viewer.zoomTo();
viewer.render();
</script>
"##,
        cif = js_str(cif_content),
    )
}

// JSON string escaping doubles as JS string literal escaping here.
fn js_str(s: &str) -> String {
    serde_json::to_string(s).expect("strings always serialize")
}

/// Fill color for one PAE cell: a reversed green scale where low error is
/// dark green and the scale cap is near white.
fn pae_cell_color(value: f32) -> String {
    let t = (value / PAE_SCALE_MAX).clamp(0.0, 1.0);
    let lerp = |a: f32, b: f32| (a + (b - a) * t).round() as u8;
    format!(
        "#{:02x}{:02x}{:02x}",
        lerp(0.0, 247.0),
        lerp(68.0, 252.0),
        lerp(27.0, 245.0)
    )
}

/// Render the PAE matrix as an SVG heatmap with the fixed color scale
/// [0, 31.75] and a separator line at every chain transition.
pub fn pae_svg(pae: &PaeMatrix) -> String {
    const SIZE: f32 = 420.0;
    let n = pae.len();
    if n == 0 {
        return String::from("<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"420\" height=\"420\"></svg>");
    }
    let cell = SIZE / n as f32;

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{SIZE}" height="{SIZE}" viewBox="0 0 {SIZE} {SIZE}">"#
    );
    // Rows are independent; large matrices produce n^2 cells.
    let rows: Vec<String> = pae
        .values
        .par_iter()
        .enumerate()
        .map(|(i, row)| {
            let mut cells = String::new();
            for (j, &value) in row.iter().enumerate() {
                let _ = write!(
                    cells,
                    r#"<rect x="{x:.2}" y="{y:.2}" width="{cell:.2}" height="{cell:.2}" fill="{fill}"/>"#,
                    x = j as f32 * cell,
                    y = i as f32 * cell,
                    fill = pae_cell_color(value),
                );
            }
            cells
        })
        .collect();
    for row in rows {
        svg.push_str(&row);
    }
    for boundary in chain_boundaries(&pae.token_chain_ids) {
        let pos = boundary as f32 * cell;
        let _ = write!(
            svg,
            r#"<line x1="{pos:.2}" y1="0" x2="{pos:.2}" y2="{SIZE}" stroke="red" stroke-width="1"/>"#
        );
        let _ = write!(
            svg,
            r#"<line x1="0" y1="{pos:.2}" x2="{SIZE}" y2="{pos:.2}" stroke="red" stroke-width="1"/>"#
        );
    }
    svg.push_str("</svg>");
    svg
}

/// The pLDDT legend shown above the visualizations.
pub fn plddt_legend_html() -> String {
    let blocks = [
        (COLOR_VERY_HIGH, "Very high (pLDDT &gt; 90)"),
        (COLOR_CONFIDENT, "Confident (90 &gt; pLDDT &gt; 70)"),
        (COLOR_LOW, "Low (70 &gt; pLDDT &gt; 50)"),
        (COLOR_VERY_LOW, "Very low (pLDDT &lt; 50)"),
    ];
    let mut html = String::from(r#"<div class="legend">"#);
    for (color, label) in blocks {
        let _ = write!(
            html,
            r#"<span class="legend-item"><span class="swatch" style="background-color: {color};"></span>{label}</span>"#
        );
    }
    html.push_str("</div>");
    html
}

fn df_to_html_table(df: &DataFrame) -> String {
    let mut html = String::from("<table><thead><tr>");
    for name in df.get_column_names() {
        let _ = write!(html, "<th>{name}</th>");
    }
    html.push_str("</tr></thead><tbody>");
    for row in 0..df.height() {
        html.push_str("<tr>");
        if let Some(values) = df.get(row) {
            for value in values {
                let _ = write!(html, "<td>{value}</td>");
            }
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
    html
}

/// Assemble the full HTML report: legend, structure view, PAE heatmap, and
/// the partitioned summary tables.
pub fn render_report(
    job_name: &str,
    residues: &ResidueConfidenceMap,
    ligands: &[LigandAtomConfidence],
    cif_content: &str,
    pae: &PaeMatrix,
    summary: &SummaryTables,
) -> String {
    let mut tables = String::new();
    for (name, df) in &summary.per_chain {
        let _ = write!(tables, "<h3>{name}</h3>{}", df_to_html_table(df));
    }
    for (name, df) in &summary.per_pair {
        let _ = write!(tables, "<h3>{name}</h3>{}", df_to_html_table(df));
    }
    if summary.scalars.height() > 0 {
        let _ = write!(
            tables,
            "<h3>Other metrics</h3>{}",
            df_to_html_table(&summary.scalars)
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{job_name} - prediction report</title>
<style>
body {{ font-family: sans-serif; margin: 1rem 2rem; }}
.legend {{ display: flex; flex-wrap: wrap; gap: 1rem; margin-bottom: 1rem; }}
.legend-item {{ display: flex; align-items: center; gap: 0.4rem; }}
.swatch {{ display: inline-block; width: 20px; height: 20px; }}
table {{ border-collapse: collapse; margin-bottom: 1rem; }}
th, td {{ border: 1px solid #ccc; padding: 0.3rem 0.6rem; text-align: right; }}
th {{ background-color: #f2f4f5; }}
</style>
</head>
<body>
<h1>{job_name}</h1>
{legend}
<h2>3D model</h2>
{viewer}
<h2>Predicted aligned error</h2>
{pae}
<h2>Summary of confidence metrics</h2>
{tables}
</body>
</html>
"#,
        legend = plddt_legend_html(),
        viewer = structure_viewer_html(residues, ligands, cif_content),
        pae = pae_svg(pae),
    )
}
