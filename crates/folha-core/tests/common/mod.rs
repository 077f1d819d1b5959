#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use folha_core::error::StorageError;
use folha_core::{DocumentStore, StorageOutcome, UploadRequest};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

/// A page of the test batch: its text lines, or `None` for a page whose content
/// stream points at a missing object.
pub type TestPage<'a> = Option<&'a [&'a str]>;

/// Build a PDF with one text block per line, Helvetica 10pt.
pub fn build_pdf(pages: &[TestPage<'_>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id: ObjectId = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::new();
    for page in pages {
        let contents: Object = match page {
            Some(lines) => {
                let mut content = String::new();
                for (i, line) in lines.iter().enumerate() {
                    content.push_str(&format!(
                        "BT /F1 10 Tf 50 {} Td ({}) Tj ET\n",
                        780 - 14 * i as i64,
                        line
                    ));
                }
                doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()))
                    .into()
            }
            None => Object::Reference((9_999, 0)),
        };
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => contents,
        });
        kids.push(Object::from(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages.len() as i64,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(595),
                Object::Integer(842),
            ],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

pub const JOAO: &[&str] = &[
    "PREFEITURA MUNICIPAL - INSTITUTO DE PREVIDENCIA",
    "Recibo de Pagamento Mensal Maio de 2023",
    "CPF: 123.456.789-09",
    "12345JOAO DA SILVAMatricula",
    "Proventos 1.234,56",
];

pub const MARIA: &[&str] = &[
    "PREFEITURA MUNICIPAL - INSTITUTO DE PREVIDENCIA",
    "Recibo de Pagamento Mensal Maio de 2023",
    "CPF: 529.982.247-25",
    "MatriculaMARIA SOUZA00777",
    "Proventos 2.000,00",
];

pub const NO_CPF: &[&str] = &["Pagina de observacoes", "Sem identificacao do beneficiario"];

pub const ANNUAL: &[&str] = &[
    "Comprovante de Rendimentos Pagos",
    "Exercicio de 2024 Ano-calendario de 2023",
    "Nome Completo529.982.247-25MARIA SOUZA",
    "Natureza do RendimentoAposentadoria",
];

/// In-memory store that deduplicates by file name.
#[derive(Default)]
pub struct MemoryStore {
    pub files: Mutex<HashMap<String, UploadRequest>>,
}

impl DocumentStore for MemoryStore {
    async fn store(&self, request: UploadRequest) -> Result<StorageOutcome, StorageError> {
        let mut files = self.files.lock().unwrap();
        if files.contains_key(&request.file_name) {
            return Ok(StorageOutcome::Duplicate);
        }
        files.insert(request.file_name.clone(), request);
        Ok(StorageOutcome::Success)
    }
}

/// Store that refuses everything.
pub struct RejectingStore;

impl DocumentStore for RejectingStore {
    async fn store(&self, _request: UploadRequest) -> Result<StorageOutcome, StorageError> {
        Err(StorageError::Rejected("quota exceeded".to_string()))
    }
}
