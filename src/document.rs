// ABOUTME: Deterministic assembler for the cession de créance legal PDF
// ABOUTME: Static legal clauses and layout constants, two embedded signature images

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

use crate::directory::{CompanyProfile, InvoiceSnapshot};
use crate::entities::cession;
use crate::error::{AppError, Result};
use crate::signature::SignatureArtifact;

// A4 geometry, points.
const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 50.0;
const BODY_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const TITLE_SIZE: f32 = 16.0;
const HEADING_SIZE: f32 = 11.0;
const BODY_SIZE: f32 = 10.0;
const FOOTER_SIZE: f32 = 8.0;
const LEADING: f32 = 14.0;
const BOX_PADDING: f32 = 10.0;

// Bounding box each signature image is scaled into.
const SIGNATURE_BOX_WIDTH: f32 = 220.0;
const SIGNATURE_BOX_HEIGHT: f32 = 80.0;

/// Statutory clauses reproduced verbatim on every document, in order.
const LEGAL_PARAGRAPHS: &[&str] = &[
    "Par la présente, le cédant déclare céder au cessionnaire, qui accepte, la créance \
     détaillée ci-dessus qu'il détient au titre des travaux de réparation réalisés, \
     conformément aux dispositions des articles 1321 à 1326 du Code civil relatifs à la \
     cession de créance.",
    "Conformément à l'article 1322 du Code civil, la présente cession est constatée par \
     écrit, à peine de nullité. Le cédant garantit l'existence de la créance cédée ainsi \
     que de ses accessoires au jour de la cession, conformément à l'article 1326 du Code \
     civil.",
    "Conformément à l'article 1324 du Code civil, la cession n'est opposable au débiteur \
     que si elle lui a été notifiée ou s'il en a pris acte. Le débiteur cédé pourra se \
     libérer valablement entre les mains du cessionnaire dès cette notification.",
    "Le cédant s'interdit de recevoir tout paiement au titre de la créance cédée \
     postérieurement à la signature des présentes. Tout règlement reçu par erreur sera \
     immédiatement reversé au cessionnaire.",
    "La présente cession est consentie à hauteur du montant indiqué ci-dessus. Fait en \
     deux exemplaires originaux, un pour chacune des parties.",
];

const FOOTER_NOTICE: &str =
    "Document établi conformément aux articles 1321 et suivants du Code civil — \
     Cession de créance professionnelle. Généré par CessionFlow.";

/// A signature ready for embedding: JPEG bytes plus pixel dimensions.
#[derive(Debug, Clone)]
pub struct SignatureImage {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl From<&SignatureArtifact> for SignatureImage {
    fn from(artifact: &SignatureArtifact) -> Self {
        SignatureImage {
            jpeg: artifact.bytes.clone(),
            width: artifact.width,
            height: artifact.height,
        }
    }
}

/// Decode a stored signature blob back into an embeddable image. A recorded
/// signature that cannot be decoded must abort assembly, never be omitted.
pub fn signature_image_from_bytes(url: &str, bytes: Vec<u8>) -> Result<SignatureImage> {
    let decoded = image::load_from_memory(&bytes)
        .map_err(|_| AppError::SignatureImageUnavailable(url.to_string()))?;
    Ok(SignatureImage {
        width: decoded.width(),
        height: decoded.height(),
        jpeg: bytes,
    })
}

/// Assemble the legal document. Pure function of its inputs: same record,
/// company, invoice, and signatures always produce the same bytes.
pub fn assemble(
    record: &cession::Model,
    company: &CompanyProfile,
    invoice: &InvoiceSnapshot,
    client_signature: Option<&SignatureImage>,
    dealer_signature: Option<&SignatureImage>,
) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let font_bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut xobjects = lopdf::Dictionary::new();
    if let Some(sig) = dealer_signature {
        let id = doc.add_object(image_xobject(sig));
        xobjects.set("SigCedant", Object::Reference(id));
    }
    if let Some(sig) = client_signature {
        let id = doc.add_object(image_xobject(sig));
        xobjects.set("SigClient", Object::Reference(id));
    }

    let resources = dictionary! {
        "Font" => dictionary! {
            "F1" => font_regular,
            "F2" => font_bold,
        },
        "XObject" => xobjects,
    };

    let ops = layout_page(record, company, invoice, client_signature, dealer_signature);
    let content = Content { operations: ops };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![Object::Reference(page_id)],
        "Count" => 1,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        "Resources" => resources,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut cursor = std::io::Cursor::new(Vec::new());
    doc.save_to(&mut cursor)
        .map_err(|e| AppError::Internal(format!("PDF serialization failed: {}", e)))?;
    Ok(cursor.into_inner())
}

fn layout_page(
    record: &cession::Model,
    company: &CompanyProfile,
    invoice: &InvoiceSnapshot,
    client_signature: Option<&SignatureImage>,
    dealer_signature: Option<&SignatureImage>,
) -> Vec<Operation> {
    let mut ops = Vec::new();
    let mut y = PAGE_HEIGHT - MARGIN - TITLE_SIZE;

    text_at(&mut ops, "F2", TITLE_SIZE, MARGIN, y, "CESSION DE CRÉANCE");
    y -= LEADING;
    text_at(
        &mut ops,
        "F1",
        BODY_SIZE,
        MARGIN,
        y,
        &format!("Relative à la facture n° {}", record.invoice_number),
    );
    y -= 2.0 * LEADING;

    // Cedant (the repair shop assigning the receivable)
    let cedant_lines = vec![
        company.name.clone(),
        company.address.clone(),
        format!("SIRET : {}", company.siret),
        format!("RCS : {}", company.rcs),
        format!("N° TVA : {}", company.vat_number),
    ];
    y = framed_block(&mut ops, y, "LE CÉDANT", &cedant_lines);
    y -= LEADING;

    // Debtor / recipient
    let mut debtor_lines = vec![record.recipient_name.clone()];
    if let Some(c) = &record.recipient_company {
        debtor_lines.push(c.clone());
    }
    debtor_lines.push(record.recipient_address.clone());
    if let Some(siret) = &record.recipient_siret {
        debtor_lines.push(format!("SIRET : {}", siret));
    }
    if let Some(rcs) = &record.recipient_rcs {
        debtor_lines.push(format!("RCS : {}", rcs));
    }
    if let Some(vehicle) = &invoice.vehicle {
        debtor_lines.push(format!("Véhicule : {}", vehicle));
    }
    if let Some(date) = &invoice.accident_date {
        debtor_lines.push(format!("Sinistre du : {}", date));
    }
    debtor_lines.push(format!(
        "Facture n° {} du montant de {}",
        record.invoice_number,
        format_eur(record.invoice_amount)
    ));
    y = framed_block(&mut ops, y, "LE DÉBITEUR CÉDÉ", &debtor_lines);
    y -= LEADING;

    text_at(
        &mut ops,
        "F2",
        HEADING_SIZE,
        MARGIN,
        y,
        &format!(
            "Montant de la créance cédée : {} — échéance au {}",
            format_eur(record.amount),
            record.due_date
        ),
    );
    y -= 2.0 * LEADING;

    for paragraph in LEGAL_PARAGRAPHS {
        y = wrapped_text(&mut ops, BODY_SIZE, MARGIN, y, BODY_WIDTH, paragraph);
        y -= LEADING * 0.5;
    }
    y -= LEADING;

    // Signatures side by side, each scaled into a fixed bounding box
    let sig_top = y;
    let left_x = MARGIN;
    let right_x = PAGE_WIDTH - MARGIN - SIGNATURE_BOX_WIDTH;

    text_at(&mut ops, "F2", BODY_SIZE, left_x, sig_top, "Le cédant (réparateur)");
    text_at(&mut ops, "F2", BODY_SIZE, right_x, sig_top, "Le client");
    let box_top = sig_top - LEADING;

    rect(&mut ops, left_x, box_top - SIGNATURE_BOX_HEIGHT, SIGNATURE_BOX_WIDTH, SIGNATURE_BOX_HEIGHT);
    rect(&mut ops, right_x, box_top - SIGNATURE_BOX_HEIGHT, SIGNATURE_BOX_WIDTH, SIGNATURE_BOX_HEIGHT);

    if let Some(sig) = dealer_signature {
        place_signature(&mut ops, "SigCedant", sig, left_x, box_top);
    }
    if let Some(sig) = client_signature {
        place_signature(&mut ops, "SigClient", sig, right_x, box_top);
    }

    // Footer
    wrapped_text(&mut ops, FOOTER_SIZE, MARGIN, MARGIN + LEADING, BODY_WIDTH, FOOTER_NOTICE);

    ops
}

fn framed_block(ops: &mut Vec<Operation>, top: f32, heading: &str, lines: &[String]) -> f32 {
    let line_count = lines.len() as f32 + 1.0; // heading line included
    let height = line_count * LEADING + 2.0 * BOX_PADDING;
    rect(ops, MARGIN, top - height, BODY_WIDTH, height);

    let mut y = top - BOX_PADDING - HEADING_SIZE;
    text_at(ops, "F2", HEADING_SIZE, MARGIN + BOX_PADDING, y, heading);
    for line in lines {
        y -= LEADING;
        text_at(ops, "F1", BODY_SIZE, MARGIN + BOX_PADDING, y, line);
    }
    top - height
}

fn place_signature(ops: &mut Vec<Operation>, name: &str, sig: &SignatureImage, box_x: f32, box_top: f32) {
    let scale =
        (SIGNATURE_BOX_WIDTH / sig.width as f32).min(SIGNATURE_BOX_HEIGHT / sig.height as f32);
    let draw_w = sig.width as f32 * scale;
    let draw_h = sig.height as f32 * scale;
    let x = box_x + (SIGNATURE_BOX_WIDTH - draw_w) / 2.0;
    let y = box_top - SIGNATURE_BOX_HEIGHT + (SIGNATURE_BOX_HEIGHT - draw_h) / 2.0;

    ops.push(Operation::new("q", vec![]));
    ops.push(Operation::new(
        "cm",
        vec![draw_w.into(), 0.into(), 0.into(), draw_h.into(), x.into(), y.into()],
    ));
    ops.push(Operation::new("Do", vec![name.into()]));
    ops.push(Operation::new("Q", vec![]));
}

fn image_xobject(sig: &SignatureImage) -> Stream {
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => sig.width as i64,
            "Height" => sig.height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        sig.jpeg.clone(),
    )
}

fn text_at(ops: &mut Vec<Operation>, font: &str, size: f32, x: f32, y: f32, text: &str) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec![font.into(), size.into()]));
    ops.push(Operation::new("Td", vec![x.into(), y.into()]));
    ops.push(Operation::new(
        "Tj",
        vec![Object::String(latin1(text), StringFormat::Literal)],
    ));
    ops.push(Operation::new("ET", vec![]));
}

/// Word-wrap `text` into the given width and emit one text op per line.
/// Returns the y position below the last rendered line.
fn wrapped_text(ops: &mut Vec<Operation>, size: f32, x: f32, top: f32, width: f32, text: &str) -> f32 {
    let mut y = top;
    for line in wrap_text(text, size, width) {
        text_at(ops, "F1", size, x, y, &line);
        y -= LEADING;
    }
    y
}

fn rect(ops: &mut Vec<Operation>, x: f32, y: f32, w: f32, h: f32) {
    ops.push(Operation::new("w", vec![0.75f32.into()]));
    ops.push(Operation::new("re", vec![x.into(), y.into(), w.into(), h.into()]));
    ops.push(Operation::new("S", vec![]));
}

/// Greedy word wrap against estimated Helvetica advance widths.
pub fn wrap_text(text: &str, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if text_width(&candidate, size) <= max_width || current.is_empty() {
            current = candidate;
        } else {
            lines.push(current);
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Approximate Helvetica advance width of a string at `size` points.
fn text_width(text: &str, size: f32) -> f32 {
    let millis: u32 = text.chars().map(char_width_millis).sum();
    millis as f32 / 1000.0 * size
}

// Coarse per-glyph widths (1/1000 em) — enough for stable wrapping.
fn char_width_millis(c: char) -> u32 {
    match c {
        'i' | 'j' | 'l' | 't' | 'f' | 'I' | '.' | ',' | ';' | ':' | '!' | '\'' | '|' => 278,
        'r' | 's' | '(' | ')' | '-' => 389,
        'm' | 'M' | 'W' | 'w' => 833,
        ' ' => 278,
        c if c.is_ascii_uppercase() => 667,
        _ => 556,
    }
}

/// Encode text as WinAnsi (Latin-1 plus the euro sign and curly apostrophe).
/// Characters outside the code page degrade to '?'.
fn latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '€' => 0x80,
            '’' => 0x92,
            'œ' => 0x9C,
            '—' => 0x97,
            c if (c as u32) <= 0xFF => c as u8,
            _ => b'?',
        })
        .collect()
}

/// French currency formatting: space-grouped thousands, comma decimals.
pub fn format_eur(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    let whole = cents / 100;
    let frac = (cents % 100).abs();
    let mut grouped = String::new();
    let digits = whole.abs().to_string();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }
    let sign = if cents < 0 { "-" } else { "" };
    format!("{}{},{:02} €", sign, grouped, frac)
}
