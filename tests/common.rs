#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docx_pdf_server::converter::{expected_output, ConvertError, DocumentConverter};
use docx_pdf_server::docx::DocxDocument;
use docx_pdf_server::{AppConfig, AppState};
use tempfile::TempDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockMode {
    Succeed,
    /// Leaves a partial pdf behind and reports a non-zero exit
    Fail,
    /// Leaves a partial pdf behind and reports a timeout
    Hang,
}

/// Converter double that writes a tiny PDF instead of running LibreOffice.
pub struct MockConverter {
    mode: MockMode,
    delay: Duration,
    calls: AtomicUsize,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl MockConverter {
    pub fn new(mode: MockMode) -> Self {
        Self {
            mode,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Each conversion holds its slot for `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Most conversions seen running at the same time.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentConverter for MockConverter {
    async fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, ConvertError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.running.fetch_sub(1, Ordering::SeqCst);

        let pdf = expected_output(input, out_dir);
        match self.mode {
            MockMode::Succeed => {
                tokio::fs::write(&pdf, b"%PDF-1.4\n%mock\n").await?;
                Ok(pdf)
            }
            MockMode::Fail => {
                tokio::fs::write(&pdf, b"%PDF-1.4 partial").await?;
                Err(ConvertError::Failed {
                    code: "status 1".to_string(),
                    stderr: "mock failure".to_string(),
                })
            }
            MockMode::Hang => {
                tokio::fs::write(&pdf, b"%PDF-1.4 partial").await?;
                Err(ConvertError::Timeout(Duration::from_secs(60)))
            }
        }
    }

    fn describe(&self) -> String {
        format!("mock ({:?})", self.mode)
    }
}

pub fn p(text: &str) -> String {
    format!("<w:p><w:r><w:t xml:space=\"preserve\">{text}</w:t></w:r></w:p>")
}

pub fn table(rows: &[&[&str]]) -> String {
    let mut xml = String::from("<w:tbl>");
    for row in rows {
        xml.push_str("<w:tr>");
        for cell in row.iter() {
            xml.push_str(&format!("<w:tc>{}</w:tc>", p(cell)));
        }
        xml.push_str("</w:tr>");
    }
    xml.push_str("</w:tbl>");
    xml
}

fn write_template(dir: &Path, name: &str, body: &str) {
    DocxDocument::from_document_xml(body)
        .unwrap()
        .save(dir.join(name))
        .unwrap();
}

/// Minimal versions of the real templates, using the same placeholders.
pub fn write_fixture_templates(dir: &Path) {
    let autorizacao = [
        p("Eu, {vendedor}, CPF {cpf_mask}, autorizo {razao_corretor} (CRECI {creci_corretor})"),
        p("Valor R$ {valor_mask_brl}, comissão de {corretagem_number}% ({corretagem_text} por cento)"),
        p("{text_4}"),
        p("Brasília, {data_completa}"),
    ]
    .concat();
    write_template(dir, "autorizacao-de-venda-corretor.docx", &autorizacao);
    write_template(dir, "autorizacao-de-venda-imob.docx", &autorizacao);

    let declaracao = [
        p("Declaro que visitei o imóvel em endereco_imovel em {{data_full}}"),
        table(&[&["Nome: nome_visitante", "CPF: cpf_visitante"], &["E-mail: email_visitante", "Tel: tel"]]),
        p("{visitante_teble}"),
        p("acompanhado por NOME DO CORRETOR, CRECI CRECI DO CORRETOR(A){imob}."),
        p("{assinatura_visitante}"),
    ]
    .concat();
    write_template(dir, "declaracao-de-visita.docx", &declaracao);

    let contrato = [
        p("Imóvel: {endereco_imovel}"),
        table(&[&["Nome: nome_prop", "CPF: cpf_prop"]]),
        p("{contratante_table}"),
        table(&[&["Corretor: nome_corretor", "CRECI: creci_corretor"]]),
        p("{contratado_table}"),
        p("Comissão de {valor_comissao} ({valor_comissao_texto})"),
        p("Brasília, {data}"),
        p("{assinatura_prop}"),
        p("{assinatura_corretor}"),
    ]
    .concat();
    write_template(dir, "contrato-de-corretagem.docx", &contrato);

    let promessa = [
        table(&[&["Tipo", "Valor"], &["tipo (vencimento)", "valor / forma / juros"]]),
        p("{vendedores}"),
        p("{compradores}"),
        p("Imóvel em {endereco_imovel}, livre e desembaraçado {gravame}; matrícula {matricula_imovel}."),
        p("Preço R$ {valor_imovel} ({valor_imovel_texto})"),
        p("{fgts}"),
        p("Com intermediação {{isImob}}."),
        p("{pagamento_table}"),
        p("{assinatura_vendedor}"),
        p("{assinatura_comprador}"),
    ]
    .concat();
    write_template(dir, "promessa-compra-e-venda.docx", &promessa);

    write_template(
        dir,
        "recibo.docx",
        &p("Recebi de {{ nome }} a quantia de {{ valor }} referente a {{ referencia }}."),
    );
}

pub struct TestContext {
    /// Holds the templates and output directories alive
    pub root: TempDir,
    pub state: AppState,
    pub converter: Arc<MockConverter>,
}

impl TestContext {
    pub fn new(mode: MockMode) -> Self {
        Self::with_converter(MockConverter::new(mode), 2)
    }

    pub fn with_converter(converter: MockConverter, max_concurrent_conversions: usize) -> Self {
        let root = tempfile::tempdir().unwrap();
        let templates_dir = root.path().join("templates");
        let output_dir = root.path().join("output");
        std::fs::create_dir_all(&templates_dir).unwrap();
        std::fs::create_dir_all(&output_dir).unwrap();
        write_fixture_templates(&templates_dir);

        let config = AppConfig {
            templates_dir,
            output_dir,
            public_base_url: "https://docx.example.com".to_string(),
            max_concurrent_conversions,
            ..AppConfig::default()
        };
        let converter = Arc::new(converter);
        let state = AppState::with_converter(config, converter.clone());

        Self {
            root,
            state,
            converter,
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.path().join("output")
    }

    pub fn output_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.output_dir())
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

pub fn autorizacao_payload(tipo: &str) -> serde_json::Value {
    serde_json::json!({
        "vendedor": "Maria Souza",
        "cpf_mask": "529.982.247-25",
        "razao_corretor": "Imobiliária Central",
        "cnpj_mask_corretor": "11.222.333/0001-81",
        "creci_corretor": "12345-J",
        "cartorio_number": "2º",
        "mat_number": "98765",
        "valor": 350000.0,
        "corretagem_number": 6,
        "pendencia": true,
        "pendencia_texto": "hipoteca com o Banco X",
        "tipo_template": tipo
    })
}

pub fn declaracao_payload() -> serde_json::Value {
    serde_json::json!({
        "endereco_imovel": "QI 5 Lago Sul",
        "visitantes": [
            {"nome": "Ana", "cpf": "529.982.247-25", "email": "ana@x.com", "tel": "61999999999"},
            {"nome": "Bruno", "cpf": "111.444.777-35", "email": "b@x.com", "tel": "61988888888"}
        ],
        "nome_corretor": "Carla Lima",
        "creci_corretor": "12345",
        "isImob": false
    })
}

pub fn contrato_payload() -> serde_json::Value {
    serde_json::json!({
        "endereco_imovel": "SQN 210 Bloco A",
        "valor_venda": 500000.0,
        "porcentagem_corretagem": 5.0,
        "contratantes": [
            {"nome": "Ana", "email": "ana@x.com", "endereco": "Rua 1", "cpf": "529.982.247-25",
             "telefone": "61999999999", "cidade": "Brasília", "cep": "70000-000", "uf": "DF"}
        ],
        "corretores": [
            {"nome": "Carla", "cnpj": "11.222.333/0001-81", "endereco": "Av. 3",
             "telefone": "6133333333", "creci": "9999", "participacao": 100.0}
        ]
    })
}

pub fn pessoa_payload(nome: &str, cpf: &str) -> serde_json::Value {
    serde_json::json!({
        "nome": nome, "nacionalidade": "brasileira", "rg_number": "123456",
        "ssp_rg": "SSP/DF", "cpf": cpf, "estado_civil": "solteira",
        "endereco": "Rua 1", "telefone": "61999999999"
    })
}

pub fn promessa_payload() -> serde_json::Value {
    serde_json::json!({
        "vendedores": [pessoa_payload("Ana", "529.982.247-25")],
        "compradores": [pessoa_payload("Bruna", "111.444.777-35")],
        "imovel": {
            "endereco_imovel": "SQS 308", "matricula_imovel": "1234", "numero_cartorio": "1º",
            "valor_imovel": 1500000.0, "forma_de_pagamento_sinal": "PIX"
        },
        "pagamentos": [
            {"tipo": "Sinal", "vencimento": "10/01/2026", "valor": 150000.0, "forma_pagamento": "PIX"}
        ]
    })
}
