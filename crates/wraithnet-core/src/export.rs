//! JSON/CSV 내보내기.
//!
//! 규칙 목록, 텔레메트리 스냅샷, 설정 백업을 텍스트로 변환한다.
//! 파일 기록은 호출자가 한다.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::CoreError;

/// 내보내기 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("unknown export format: {other}")),
        }
    }
}

/// 들여쓰기 2칸 JSON
pub fn to_json_pretty<T: Serialize + ?Sized>(value: &T) -> Result<String, CoreError> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// 레코드 목록을 CSV로 변환
///
/// 헤더는 첫 레코드의 필드명(선언 순서)이며 모든 값은 큰따옴표로 감싼다.
/// 빈 목록은 빈 문자열이 된다.
pub fn to_csv<T: Serialize>(rows: &[T]) -> Result<String, CoreError> {
    let objects = rows
        .iter()
        .map(|row| match serde_json::to_value(row)? {
            Value::Object(map) => Ok(map),
            other => Err(CoreError::Validation {
                field: "rows".to_string(),
                message: format!("CSV 행은 객체여야 합니다: {other}"),
            }),
        })
        .collect::<Result<Vec<_>, CoreError>>()?;

    let Some(first) = objects.first() else {
        return Ok(String::new());
    };
    let headers: Vec<&String> = first.keys().collect();

    let mut lines = Vec::with_capacity(objects.len() + 1);
    lines.push(
        headers
            .iter()
            .map(|h| h.as_str())
            .collect::<Vec<_>>()
            .join(","),
    );
    for object in &objects {
        let cells: Vec<String> = headers
            .iter()
            .map(|h| quote_cell(object.get(h.as_str())))
            .collect();
        lines.push(cells.join(","));
    }
    Ok(lines.join("\n"))
}

fn quote_cell(value: Option<&Value>) -> String {
    let raw = match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    format!("\"{}\"", raw.replace('"', "\"\""))
}

/// 형식에 맞춰 직렬화
pub fn render<T: Serialize>(rows: &[T], format: ExportFormat) -> Result<String, CoreError> {
    match format {
        ExportFormat::Json => to_json_pretty(rows),
        ExportFormat::Csv => to_csv(rows),
    }
}

/// 직렬화 후 파일로 기록
pub fn write_export<T: Serialize>(
    rows: &[T],
    format: ExportFormat,
    path: &Path,
) -> Result<(), CoreError> {
    fs::write(path, render(rows, format)?)?;
    tracing::info!("{} 내보내기 완료: {}", format, path.display());
    Ok(())
}

/// `prefix_<unix 밀리초>.<확장자>` 형태의 파일 이름
pub fn export_file_name(prefix: &str, format: ExportFormat) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    format!("{prefix}_{millis}.{}", format.extension())
}
