//! # Document Rendering
//!
//! [`DocumentRenderer`] turns one [`Report`] into bytes the client can
//! display inline. The bundled [`HtmlRenderer`] fills the `informe.html`
//! template with auto-escaping on; only the generated barcode SVG is marked
//! safe. A PDF backend implements the same trait.

use std::sync::Arc;

use minijinja::{AutoEscape, Environment};
use serde::Serialize;

use crate::barcode::code128_svg;
use crate::error::ReportError;
use crate::format::{clean_inline, clean_narrative, group_techniques, to_bullets, Block};
use crate::model::Report;

const TEMPLATE_NAME: &str = "informe.html";
const TEMPLATE_SOURCE: &str = include_str!("../templates/informe.html");

/// A rendered report ready to be served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    /// MIME type, including charset where relevant.
    pub content_type: &'static str,
    /// File extension without the dot.
    pub extension: &'static str,
    /// Encoded document.
    pub body: Vec<u8>,
}

impl RenderedDocument {
    /// Download name for the report, e.g. `informe_B24-1187.html`.
    pub fn filename(&self, document_ref: &str) -> String {
        let safe: String = document_ref
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("informe_{safe}.{}", self.extension)
    }
}

/// Produces a displayable document from a report row.
pub trait DocumentRenderer: Send + Sync {
    /// Render `report`. Failures surface as [`ReportError::Render`].
    fn render(&self, report: &Report) -> Result<RenderedDocument, ReportError>;
}

#[derive(Serialize)]
struct Field {
    label: &'static str,
    value: String,
}

#[derive(Serialize)]
struct Section {
    title: &'static str,
    blocks: Vec<Block>,
}

#[derive(Serialize)]
struct Page {
    institution: String,
    document_ref: String,
    barcode: Option<String>,
    fields: Vec<Field>,
    sections: Vec<Section>,
    technique_rows: Vec<Vec<String>>,
}

/// Renders a self-contained HTML page from the bundled template.
#[derive(Clone)]
pub struct HtmlRenderer {
    institution: String,
    env: Arc<Environment<'static>>,
}

impl std::fmt::Debug for HtmlRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HtmlRenderer")
            .field("institution", &self.institution)
            .finish_non_exhaustive()
    }
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self::new("Anatomía Patológica")
    }
}

impl HtmlRenderer {
    /// Renderer whose page header names `institution`.
    pub fn new(institution: impl Into<String>) -> Self {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        if let Err(e) = env.add_template(TEMPLATE_NAME, TEMPLATE_SOURCE) {
            tracing::error!("report template failed to load: {e}");
        }
        Self {
            institution: institution.into(),
            env: Arc::new(env),
        }
    }

    fn page(&self, report: &Report) -> Page {
        let document_ref = report.document_ref.trim().to_owned();
        let barcode = match code128_svg(&document_ref) {
            Ok(svg) => Some(svg),
            Err(e) => {
                tracing::warn!(document_ref = %document_ref, "barcode omitted: {e}");
                None
            }
        };

        let field = |label, value: &str| Field {
            label,
            value: clean_inline(value),
        };
        let fields = vec![
            field("Paciente", &report.patient_name),
            field("RUT", &report.subject),
            field("Servicio", &report.service),
            field("Médico tratante", &report.physician),
            field("Validación", &report.validated_display()),
        ];

        let sections = [
            ("Antecedentes clínicos", &report.clinical_history),
            ("Examen macroscópico", &report.macroscopic_exam),
            ("Examen microscópico", &report.microscopic_exam),
            ("Conclusión diagnóstica", &report.diagnostic_conclusion),
            ("Informe complementario", &report.complementary_report),
        ]
        .into_iter()
        .map(|(title, narrative)| Section {
            title,
            blocks: to_bullets(&clean_narrative(narrative)),
        })
        .filter(|section| !section.blocks.is_empty())
        .collect();

        Page {
            institution: self.institution.clone(),
            document_ref,
            barcode,
            fields,
            sections,
            technique_rows: group_techniques(&report.techniques),
        }
    }
}

impl DocumentRenderer for HtmlRenderer {
    fn render(&self, report: &Report) -> Result<RenderedDocument, ReportError> {
        let render_err = |e: minijinja::Error| ReportError::Render(e.to_string());
        let html = self
            .env
            .get_template(TEMPLATE_NAME)
            .map_err(render_err)?
            .render(self.page(report))
            .map_err(render_err)?;

        Ok(RenderedDocument {
            content_type: "text/html; charset=utf-8",
            extension: "html",
            body: html.into_bytes(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Report {
        Report {
            document_ref: "B24-1187".into(),
            subject: "9895722-7".into(),
            patient_name: "Ana <Rojas>".into(),
            service: "CIRUG\\'cdA".into(),
            physician: "Dr. Soto".into(),
            validated_at: None,
            clinical_history: "Dolor epigástrico\r\n- ardor\r\n- náuseas".into(),
            macroscopic_exam: String::new(),
            microscopic_exam: String::new(),
            diagnostic_conclusion: "Gastritis crónica".into(),
            complementary_report: String::new(),
            techniques: ["HE", "PAS", "Giemsa", "Ki-67", "p53"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    fn render_text(report: &Report) -> String {
        let doc = HtmlRenderer::default().render(report).unwrap();
        assert_eq!(doc.content_type, "text/html; charset=utf-8");
        String::from_utf8(doc.body).unwrap()
    }

    fn squash(html: &str) -> String {
        html.lines().map(str::trim).collect()
    }

    #[test]
    fn renders_escaped_fields() {
        let html = render_text(&sample());
        assert!(html.contains("Ana &lt;Rojas&gt;"));
        assert!(!html.contains("<Rojas>"));
        assert!(html.contains("CIRUGÍA"));
    }

    #[test]
    fn narrative_markup_is_escaped() {
        let mut report = sample();
        report.diagnostic_conclusion = "- <script>alert(1)</script>\na & b".into();
        let html = render_text(&report);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("<p>a &amp; b</p>"));
    }

    #[test]
    fn narrative_sections_use_lists() {
        let html = squash(&render_text(&sample()));
        assert!(html.contains("<p>Dolor epigástrico</p><ul><li>ardor</li><li>náuseas</li></ul>"));
        assert!(html.contains("<h2>Conclusión diagnóstica</h2>"));
        assert!(!html.contains("Examen macroscópico"), "empty sections are omitted");
    }

    #[test]
    fn rtf_narrative_is_stripped() {
        let mut report = sample();
        report.diagnostic_conclusion = r"{\rtf1\ansi\deff0 Gastritis cr\'f3nica\par leve}".into();
        let html = squash(&render_text(&report));
        assert!(!html.contains("rtf1"));
        assert!(!html.contains("\\par"));
        assert!(html.contains("<p>Gastritis crónica</p><p>leve</p>"));
    }

    #[test]
    fn decomposed_fields_render_composed() {
        let mut report = sample();
        report.patient_name = "Ine\u{301}s Mun\u{303}oz".into();
        let html = render_text(&report);
        assert!(html.contains("Inés Muñoz"));
    }

    #[test]
    fn techniques_render_four_per_row() {
        let html = render_text(&sample());
        assert!(html.contains("<tr><td>HE</td><td>PAS</td><td>Giemsa</td><td>Ki-67</td></tr>"));
        assert!(html.contains("<tr><td>p53</td></tr>"));
    }

    #[test]
    fn techniques_section_omitted_when_empty() {
        let mut report = sample();
        report.techniques.clear();
        assert!(!render_text(&report).contains("Técnicas realizadas"));
    }

    #[test]
    fn barcode_of_biopsy_number_is_embedded() {
        let html = render_text(&sample());
        let expected = code128_svg("B24-1187").unwrap();
        assert!(html.contains("<div class=\"barcode\">"));
        assert!(html.contains(&expected), "svg is inserted unescaped");
    }

    #[test]
    fn unencodable_reference_renders_without_barcode() {
        let mut report = sample();
        report.document_ref = "B24-ñ".into();
        let html = render_text(&report);
        assert!(!html.contains("class=\"barcode\""));
        assert!(html.contains("B24-ñ"));
    }

    #[test]
    fn filename_is_sanitized() {
        let doc = HtmlRenderer::default().render(&sample()).unwrap();
        assert_eq!(doc.filename("B24-1187"), "informe_B24-1187.html");
        assert_eq!(doc.filename("a\"b/c"), "informe_a_b_c.html");
    }
}
