use crate::corpus::record::{Anomaly, Record, RecordSet};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnomalyCounts {
    pub missing_file: usize,
    pub missing_metadata: usize,
    pub orphan_file: usize,
    pub misclassified: usize,
}

impl AnomalyCounts {
    pub fn tally(records: &RecordSet) -> Self {
        let mut out = Self::default();
        for anomaly in records.values().flat_map(|r| r.anomalies.iter()) {
            match anomaly {
                Anomaly::MissingFile => out.missing_file += 1,
                Anomaly::MissingMetadata { .. } => out.missing_metadata += 1,
                Anomaly::OrphanFile => out.orphan_file += 1,
                Anomaly::Misclassified { .. } => out.misclassified += 1,
            }
        }
        out
    }
}

fn classify_record(record: &mut Record) {
    let Some(file) = record.file.as_ref() else {
        record.note(Anomaly::MissingFile);
        return;
    };

    if let Some(expected) = record.classification()
        && !expected.matches_folder(&file.folder)
    {
        let actual_folder = file.folder.clone();
        record.note(Anomaly::Misclassified {
            expected,
            actual_folder,
        });
    }
}

/// Derive file-presence and classification anomalies once all sources are
/// merged. File presence is checked first so notes render in a fixed order.
pub fn classify(records: &mut RecordSet) {
    for record in records.values_mut() {
        classify_record(record);
    }
}
