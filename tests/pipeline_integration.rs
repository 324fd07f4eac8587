use anyhow::Result;
use chrono::NaiveDate;
use tempfile::tempdir;

use sisant_ingest::config::PipelineConfig;
use sisant_ingest::domain::{LegalEntity, RegistrationStatus, TypeOfUse};
use sisant_ingest::ingest;
use sisant_ingest::pipeline::Pipeline;

// A small registry export: one preamble line, the published header, a
// duplicated aircraft id with a whitespace variant, one malformed id,
// and operators spanning both tax-id kinds.
const REGISTRY_EXPORT: &str = "\
Dados atualizados em: 02/08/2023
CODIGO_AERONAVE;DATA_VALIDADE;OPERADOR;CPF_CNPJ;TIPO_USO;FABRICANTE;MODELO;NUMERO_SERIE;PESO_MAXIMO_DECOLAGEM_KG;RAMO_ATIVIDADE
PR-000000001 ;01/06/2024;MARIA DA SILVA;CPF:123.456.789-**;Básico;DJI ;Mavic Mini;SN001;0.249;Recreativo
PR-000000001;01/06/2024;MARIA D. SILVA;CPF:123.456.789-**;Básico; dji;DJI Mini 2;SN002;0.249;Recreativo
XX-123;01/06/2024;OPERADOR FANTASMA;CPF:999.999.999-**;Básico;DJI;Phantom 4;SN003;1.2;Recreativo
PP-000000002;01/05/2023;ACME AGRO LTDA;CNPJ:12.345.678/0001-90;Avançado;XMOBOTS;Arator 5B;SN004;9.0;pulverização agrícola
PS-000000003;01/01/2019;JOAO SANTOS;CPF:111.222.333-**;Básico;fabricação própria;quadcopter diy;SN005;1.5;aeromodelismo
PP-000000004;15/03/2024;ACME AGRO LTDA.;CNPJ:12.345.678/0001-90;Avançado;DJI;AGRAS T10;SN006;24.9;agricultura de precisão
";

fn config_with_today(year: i32, month: u32, day: u32) -> PipelineConfig {
    PipelineConfig {
        today: NaiveDate::from_ymd_opt(year, month, day),
        ..PipelineConfig::default()
    }
}

#[test]
fn test_registry_export_end_to_end() -> Result<()> {
    // Decode the export and run the full pipeline against a fixed date
    let ingested = ingest::read_registry(REGISTRY_EXPORT.as_bytes())?;
    assert_eq!(ingested.records.len(), 6);
    assert_eq!(ingested.broken_rows, 0);

    let pipeline = Pipeline::new(&config_with_today(2023, 8, 2))?;
    let batch = pipeline.run(ingested.records)?;

    // One malformed id and one duplicate must be gone
    assert_eq!(batch.report.rows_in, 6);
    assert_eq!(batch.report.invalid_ids, 1);
    assert_eq!(batch.report.duplicates_removed, 1);
    assert_eq!(batch.report.rows_out, 4);

    let by_id = batch.by_aircraft_id();
    assert_eq!(by_id.len(), 4);

    // The whitespace variant collapsed into one row; the later
    // occurrence won, and its manufacturer canonicalized to "dji"
    let survivor = by_id["PR-000000001"];
    assert_eq!(survivor.manufacturer, "dji");
    assert_eq!(survivor.model, "mini");
    assert_eq!(survivor.operator_name, "MARIA D. SILVA");
    assert_eq!(survivor.legal_entity, LegalEntity::Individual);
    assert_eq!(survivor.entity_number, "123456789");
    assert_eq!(survivor.type_of_use, TypeOfUse::Basic);
    assert_eq!(survivor.status, RegistrationStatus::Ok);

    // Both ACME rows share an entity, so the later spelling was
    // corrected back to the first-seen one
    assert_eq!(batch.report.operator_names_corrected, 1);
    assert_eq!(by_id["PP-000000004"].operator_name, "ACME AGRO LTDA");
    assert_eq!(by_id["PP-000000004"].legal_entity, LegalEntity::Company);
    assert_eq!(by_id["PP-000000004"].entity_number, "12345678000190");

    // Status spread: expired past the renewal window, inside it, current
    assert_eq!(by_id["PS-000000003"].status, RegistrationStatus::Inactive);
    assert_eq!(
        by_id["PS-000000003"].registration_date,
        NaiveDate::from_ymd_opt(2017, 1, 1).unwrap()
    );
    assert_eq!(by_id["PP-000000002"].status, RegistrationStatus::Renew);

    // Categorical columns ended on canonical labels
    assert_eq!(by_id["PS-000000003"].manufacturer, "custom");
    assert_eq!(by_id["PP-000000002"].manufacturer, "xmobots");
    assert_eq!(by_id["PP-000000002"].activity, "engenharia");
    assert_eq!(by_id["PP-000000004"].activity, "engenharia");
    assert_eq!(by_id["PP-000000004"].model, "agras");

    // Models outside the scoped manufacturer keep their normalized text
    assert_eq!(by_id["PP-000000002"].model, "arator5b");

    Ok(())
}

#[test]
fn test_same_batch_twice_is_byte_identical() -> Result<()> {
    let pipeline = Pipeline::new(&config_with_today(2023, 8, 2))?;

    let first = pipeline.run(ingest::read_registry(REGISTRY_EXPORT.as_bytes())?.records)?;
    let second = pipeline.run(ingest::read_registry(REGISTRY_EXPORT.as_bytes())?.records)?;

    assert_eq!(first.records, second.records);
    assert_eq!(
        serde_json::to_string(&first.records)?,
        serde_json::to_string(&second.records)?
    );

    Ok(())
}

#[test]
fn test_persisted_outputs_reload() -> Result<()> {
    // Set up a scratch directory for both output formats
    let temp_dir = tempdir()?;
    let json_path = temp_dir.path().join("clean_batch.json");
    let csv_path = temp_dir.path().join("clean_records.csv");

    let input_path = temp_dir.path().join("export.csv");
    std::fs::write(&input_path, REGISTRY_EXPORT)?;

    let ingested = ingest::read_registry_path(&input_path)?;
    let pipeline = Pipeline::new(&config_with_today(2023, 8, 2))?;
    let batch = pipeline.run(ingested.records)?;

    batch.persist_to_json(&json_path)?;
    let csv_file = std::fs::File::create(&csv_path)?;
    ingest::write_clean_csv(csv_file, &batch.records)?;

    // The JSON document holds both the records and the run report
    let reloaded: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&json_path)?)?;
    assert_eq!(
        reloaded["records"].as_array().map(|a| a.len()),
        Some(batch.records.len())
    );
    assert_eq!(reloaded["report"]["rows_out"], 4);
    assert_eq!(reloaded["report"]["today"], "2023-08-02");

    // The CSV re-export carries ISO dates under its own header
    let written = std::fs::read_to_string(&csv_path)?;
    assert!(written.starts_with("aircraft_id;expiration_date;registration_date;status"));
    assert!(written.contains("PR-000000001;2024-06-01;2022-06-01;ok"));

    Ok(())
}

#[test]
fn test_reference_date_drives_status() -> Result<()> {
    // Shortly after the oldest expiration the registration is still
    // renewable; years later it has gone inactive
    let early = Pipeline::new(&config_with_today(2019, 2, 1))?;
    let late = Pipeline::new(&config_with_today(2023, 8, 2))?;

    let batch = early.run(ingest::read_registry(REGISTRY_EXPORT.as_bytes())?.records)?;
    assert_eq!(
        batch.by_aircraft_id()["PS-000000003"].status,
        RegistrationStatus::Renew
    );

    let batch = late.run(ingest::read_registry(REGISTRY_EXPORT.as_bytes())?.records)?;
    assert_eq!(
        batch.by_aircraft_id()["PS-000000003"].status,
        RegistrationStatus::Inactive
    );

    Ok(())
}
