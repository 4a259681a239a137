//! Dense integer encoding of categorical labels.
//!
//! Codes are assigned by sorted uniqueness so that the same label set always
//! yields the same code for the same value. Cross-validation relies on this:
//! every fold is written with codes taken from a single encoding pass.
use std::collections::BTreeSet;
use std::fmt::Display;

use anyhow::Result;

use crate::error::PrepError;

/// Legend between original label values and integer codes.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelEncoder<T> {
    classes: Vec<T>,
}

/// Result of encoding an optional label vector.
#[derive(Debug, Clone)]
pub struct EncodedLabels<T> {
    /// One code per sample; all zero when labels were absent.
    pub codes: Vec<usize>,
    /// `None` when labels were absent.
    pub encoder: Option<LabelEncoder<T>>,
}

impl<T: Ord + Clone> LabelEncoder<T> {
    pub fn fit(labels: &[T]) -> Self {
        let classes = labels
            .iter()
            .cloned()
            .collect::<BTreeSet<T>>()
            .into_iter()
            .collect();
        LabelEncoder { classes }
    }

    /// Rebuild an encoder from classes listed in code order.
    ///
    /// The classes must be strictly ascending, which is the order `fit`
    /// assigns codes in.
    pub fn from_classes(classes: Vec<T>) -> Result<Self>
    where
        T: Display,
    {
        if let Some(pair) = classes.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(PrepError::InvalidLegend(format!(
                "'{}' is listed before '{}'",
                pair[0], pair[1]
            ))
            .into());
        }
        Ok(LabelEncoder { classes })
    }

    /// The unique label values, indexed by code.
    pub fn classes(&self) -> &[T] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Iterate `(code, value)` pairs in code order.
    pub fn legend(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.classes.iter().enumerate()
    }

    pub fn code_of(&self, label: &T) -> Option<usize> {
        self.classes.binary_search(label).ok()
    }

    pub fn transform(&self, labels: &[T]) -> Result<Vec<usize>>
    where
        T: Display,
    {
        labels
            .iter()
            .map(|label| {
                self.code_of(label)
                    .ok_or_else(|| anyhow::Error::from(PrepError::UnknownLabel(label.to_string())))
            })
            .collect()
    }

    pub fn inverse_transform(&self, codes: &[usize]) -> Result<Vec<T>> {
        codes
            .iter()
            .map(|&code| {
                self.classes
                    .get(code)
                    .cloned()
                    .ok_or_else(|| anyhow::Error::from(PrepError::UnknownCode(code)))
            })
            .collect()
    }
}

/// Encode an optional label vector for `n_samples` rows.
///
/// Absent labels give every sample the placeholder code 0 and no legend.
/// Present labels must have exactly one value per sample.
pub fn encode_labels<T>(labels: Option<&[T]>, n_samples: usize) -> Result<EncodedLabels<T>>
where
    T: Ord + Clone + Display,
{
    let Some(labels) = labels else {
        return Ok(EncodedLabels {
            codes: vec![0; n_samples],
            encoder: None,
        });
    };

    if labels.len() != n_samples {
        return Err(PrepError::ShapeMismatch {
            what: "labels",
            expected: n_samples,
            found: labels.len(),
        }
        .into());
    }

    let encoder = LabelEncoder::fit(labels);
    let codes = encoder.transform(labels)?;
    log::debug!(
        "Encoded {} labels into {} classes",
        codes.len(),
        encoder.n_classes()
    );

    Ok(EncodedLabels {
        codes,
        encoder: Some(encoder),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn codes_follow_sorted_uniqueness() {
        let labels = strings(&["healthy", "ibd", "healthy", "cancer"]);
        let encoded = encode_labels(Some(&labels[..]), 4).unwrap();
        let encoder = encoded.encoder.unwrap();

        assert_eq!(encoder.classes(), &strings(&["cancer", "healthy", "ibd"])[..]);
        assert_eq!(encoded.codes, vec![1, 2, 1, 0]);
    }

    #[test]
    fn decoding_reconstructs_labels() {
        let labels = strings(&["b", "a", "c", "a", "b", "b"]);
        let encoded = encode_labels(Some(&labels[..]), labels.len()).unwrap();
        let decoded = encoded
            .encoder
            .unwrap()
            .inverse_transform(&encoded.codes)
            .unwrap();
        assert_eq!(decoded, labels);
    }

    #[test]
    fn encoding_is_independent_of_label_order() {
        let a = LabelEncoder::fit(&strings(&["x", "y", "z"]));
        let b = LabelEncoder::fit(&strings(&["z", "x", "y", "x"]));
        assert_eq!(a, b);
    }

    #[test]
    fn absent_labels_get_code_zero() {
        let encoded = encode_labels::<String>(None, 3).unwrap();
        assert_eq!(encoded.codes, vec![0, 0, 0]);
        assert!(encoded.encoder.is_none());
    }

    #[test]
    fn length_mismatch_is_a_shape_error() {
        let labels = strings(&["a", "b"]);
        let err = encode_labels(Some(&labels[..]), 3).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PrepError>(),
            Some(PrepError::ShapeMismatch {
                expected: 3,
                found: 2,
                ..
            })
        ));
    }

    #[test]
    fn encoder_rebuilt_from_classes_matches_fit() {
        let fitted = LabelEncoder::fit(&strings(&["ibd", "healthy", "ibd"]));
        let rebuilt = LabelEncoder::from_classes(strings(&["healthy", "ibd"])).unwrap();
        assert_eq!(fitted, rebuilt);

        let err = LabelEncoder::from_classes(strings(&["ibd", "healthy"])).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PrepError>(),
            Some(PrepError::InvalidLegend(_))
        ));
    }

    #[test]
    fn unknown_values_are_rejected() {
        let encoder = LabelEncoder::fit(&strings(&["a"]));
        assert!(encoder.transform(&strings(&["b"])).is_err());
        assert!(encoder.inverse_transform(&[1]).is_err());
    }
}
