use tdms2bin_types::{ChannelData, Container};

use crate::error::ScalingLookupError;

/// Линейное преобразование `offset + gain * x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalingCoefficients {
    pub offset: f64,
    pub gain: f64,
}

impl ScalingCoefficients {
    /// Тождественное преобразование, подставляемое при ошибке поиска
    pub const IDENTITY: Self = Self {
        offset: 0.0,
        gain: 1.0,
    };

    pub const fn new(
        offset: f64,
        gain: f64,
    ) -> Self {
        Self { offset, gain }
    }

    #[inline]
    pub fn apply(
        &self,
        raw: f64,
    ) -> f64 {
        self.offset + self.gain * raw
    }
}

impl Default for ScalingCoefficients {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Ищет пару (offset, gain) для канала в группе коэффициентов.
///
/// Канал группы коэффициентов должен содержать ровно два конечных числа.
/// Ошибка не прерывает конвертацию: вызывающий код подставляет
/// [`ScalingCoefficients::IDENTITY`].
pub fn lookup_scaling(
    container: &Container,
    scale_group: &str,
    channel_name: &str,
) -> Result<ScalingCoefficients, ScalingLookupError> {
    let group = container
        .group(scale_group)
        .ok_or_else(|| ScalingLookupError::MissingGroup(scale_group.to_string()))?;

    let channel = group
        .channel(channel_name)
        .ok_or_else(|| ScalingLookupError::MissingChannel(channel_name.to_string()))?;

    let values = match &channel.data {
        ChannelData::Numeric(v) => v,
        ChannelData::NonNumeric { type_name, .. } => {
            return Err(ScalingLookupError::NonNumeric {
                channel: channel_name.to_string(),
                type_name: type_name.clone(),
            });
        }
    };

    let &[offset, gain] = values.as_slice() else {
        return Err(ScalingLookupError::WrongArity {
            channel: channel_name.to_string(),
            found: values.len(),
        });
    };

    if !offset.is_finite() || !gain.is_finite() {
        return Err(ScalingLookupError::NonFinite {
            channel: channel_name.to_string(),
        });
    }

    Ok(ScalingCoefficients::new(offset, gain))
}

#[cfg(test)]
mod tests {
    use tdms2bin_types::{Channel, Group};

    use super::*;

    fn container(coeffs: Channel) -> Container {
        Container::new().with_group(Group::new("Scaling Coefficients").with_channel(coeffs))
    }

    #[test]
    fn test_lookup_pair() {
        let c = container(Channel::with_samples("ch1", vec![10.0, 2.0]));

        let s = lookup_scaling(&c, "Scaling Coefficients", "ch1").unwrap();

        assert_eq!(s, ScalingCoefficients::new(10.0, 2.0));
        assert_eq!(s.apply(3.0), 16.0);
    }

    #[test]
    fn test_lookup_failures() {
        let c = container(Channel::with_samples("ch1", vec![10.0, 2.0, 5.0]));

        assert_eq!(
            lookup_scaling(&c, "Scaling Coefficients", "ch1"),
            Err(ScalingLookupError::WrongArity {
                channel: "ch1".into(),
                found: 3
            })
        );
        assert_eq!(
            lookup_scaling(&c, "Scaling Coefficients", "ch2"),
            Err(ScalingLookupError::MissingChannel("ch2".into()))
        );
        assert_eq!(
            lookup_scaling(&c, "Coeffs", "ch1"),
            Err(ScalingLookupError::MissingGroup("Coeffs".into()))
        );
    }

    #[test]
    fn test_lookup_non_numeric_and_non_finite() {
        let mut text = Channel::new("ch1");
        text.data = ChannelData::NonNumeric {
            type_name: "String".into(),
            count: 2,
        };
        assert!(matches!(
            lookup_scaling(&container(text), "Scaling Coefficients", "ch1"),
            Err(ScalingLookupError::NonNumeric { .. })
        ));

        let nan = container(Channel::with_samples("ch1", vec![f64::NAN, 1.0]));
        assert!(matches!(
            lookup_scaling(&nan, "Scaling Coefficients", "ch1"),
            Err(ScalingLookupError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_identity_default() {
        let s = lookup_scaling(&Container::new(), "x", "y").unwrap_or_default();

        assert_eq!(s, ScalingCoefficients::IDENTITY);
        assert_eq!(s.apply(-7.25), -7.25);
    }
}
