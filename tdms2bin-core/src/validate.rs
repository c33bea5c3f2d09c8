use log::Level;
use tdms2bin_types::Container;

use crate::{
    diagnostics::Diagnostics,
    error::{ConvertError, ConvertResult},
};

/// Ожидаемое количество групп: данные + коэффициенты
pub const EXPECTED_GROUP_COUNT: usize = 2;

/// Проверяет, что в контейнере есть группа данных и группа коэффициентов.
///
/// Лишние группы допустимы (только предупреждение), отсутствие любой из
/// двух обязательных групп фатально.
pub fn validate_structure(
    container: &Container,
    data_group: &str,
    scale_group: &str,
    diag: &dyn Diagnostics,
) -> ConvertResult<()> {
    let found = container.group_names();

    if found.len() != EXPECTED_GROUP_COUNT {
        diag.emit(
            Level::Warn,
            format_args!(
                "Expected {EXPECTED_GROUP_COUNT} groups, got {}",
                found.len()
            ),
        );
    }

    let missing: Vec<String> = [data_group, scale_group]
        .into_iter()
        .filter(|name| !found.contains(name))
        .map(str::to_string)
        .collect();

    if !missing.is_empty() {
        for name in &missing {
            diag.emit(Level::Error, format_args!("[{name}] not in container"));
        }

        return Err(ConvertError::MissingGroups {
            missing,
            found: found.iter().map(|s| s.to_string()).collect(),
        });
    }

    diag.emit(Level::Debug, format_args!("Found groups: {found:?}"));

    Ok(())
}
