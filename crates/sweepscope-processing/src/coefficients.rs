//! Precomputed coefficient table
//!
//! One row per (rate, filter) pair. Supporting another sampling rate means
//! adding rows here; nothing downstream changes.

#![allow(clippy::excessive_precision)]

use sweepscope_core::{ExgType, FilterFamily, NotchType, SampleRate};

use crate::biquad::BiquadCoeffs;

/// Concrete filter whose coefficients can be looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Baseline,
    Exg(ExgType),
    Notch(NotchType),
}

impl FilterKind {
    pub fn family(self) -> FilterFamily {
        match self {
            FilterKind::Baseline => FilterFamily::Baseline,
            FilterKind::Exg(_) => FilterFamily::Exg,
            FilterKind::Notch(_) => FilterFamily::Notch,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            FilterKind::Baseline => 1,
            FilterKind::Exg(exg) => exg.code(),
            FilterKind::Notch(notch) => notch.code(),
        }
    }
}

/// Cascade of sections to run in order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoeffSet {
    pub sections: &'static [BiquadCoeffs],
}

impl CoeffSet {
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

const fn c(b0: f32, b1: f32, b2: f32, a1: f32, a2: f32) -> BiquadCoeffs {
    BiquadCoeffs::new(b0, b1, b2, a1, a2)
}

// Baseline: 0.5 Hz high-pass
static BASELINE_250: [BiquadCoeffs; 1] =
    [c(0.99115360, -1.98230719, 0.99115360, -1.98222893, 0.98238545)];
static BASELINE_500: [BiquadCoeffs; 1] =
    [c(0.99556697, -1.99113394, 0.99556697, -1.99111429, 0.99115360)];
static BASELINE_1000: [BiquadCoeffs; 1] =
    [c(0.99778102, -1.99556205, 0.99778102, -1.99555712, 0.99556697)];
static BASELINE_2000: [BiquadCoeffs; 1] =
    [c(0.99888990, -1.99777979, 0.99888990, -1.99777856, 0.99778102)];

// ECG 30 Hz LP, EOG 10 Hz LP, EEG 45 Hz LP, EMG 70 Hz HP; indexed by ExgType
static EXG_250: [[BiquadCoeffs; 1]; 4] = [
    [c(0.09131490, 0.18262980, 0.09131490, -0.98240579, 0.34766539)],
    [c(0.01335920, 0.02671840, 0.01335920, -1.64745998, 0.70089678)],
    [c(0.17508764, 0.35017529, 0.17508764, -0.51930341, 0.21965398)],
    [c(0.23976966, -0.47953932, 0.23976966, 0.22115344, 0.18023207)],
];
static EXG_500: [[BiquadCoeffs; 1]; 4] = [
    [c(0.02785977, 0.05571953, 0.02785977, -1.47548044, 0.58691951)],
    [c(0.00362168, 0.00724336, 0.00362168, -1.82269493, 0.83718165)],
    // EEG: 45 Hz Butterworth designed for 500 Hz; do not substitute the 250 Hz row
    [c(0.05644846, 0.11289692, 0.05644846, -1.22465298, 0.45044744)],
    [c(0.52996723, -1.05993445, 0.52996723, -0.82523238, 0.29463653)],
];
static EXG_1000: [[BiquadCoeffs; 1]; 4] = [
    [c(0.00782021, 0.01564042, 0.00782021, -1.73472577, 0.76600660)],
    [c(0.00094469, 0.00188938, 0.00094469, -1.91119707, 0.91497583)],
    [c(0.01658193, 0.03316386, 0.01658193, -1.60413018, 0.67045791)],
    [c(0.73202248, -1.46404495, 0.73202248, -1.39089528, 0.53719462)],
];
static EXG_2000: [[BiquadCoeffs; 1]; 4] = [
    [c(0.00208057, 0.00416113, 0.00208057, -1.86689228, 0.87521455)],
    [c(0.00024136, 0.00048272, 0.00024136, -1.95557824, 0.95654368)],
    [c(0.00453622, 0.00907244, 0.00453622, -1.80064506, 0.81878993)],
    [c(0.85593060, -1.71186120, 0.85593060, -1.69099638, 0.73272603)],
];

// Two-section band-reject; indexed by NotchType (50 Hz, 60 Hz)
static NOTCH_250: [[BiquadCoeffs; 2]; 2] = [
    [
        c(0.93137886, -0.57635175, 0.93137886, -0.53127491, 0.93061518),
        c(1.0, -0.61881558, 1.0, -0.66243374, 0.93214913),
    ],
    [
        c(0.93137886, -0.11711144, 0.93137886, -0.05269865, 0.93123336),
        c(1.0, -0.12573985, 1.0, -0.18985625, 0.93153034),
    ],
];
static NOTCH_500: [[BiquadCoeffs; 2]; 2] = [
    [
        c(0.96508099, -1.56202714, 0.96508099, -1.56858163, 0.96424138),
        c(1.0, -1.61854514, 1.0, -1.61100358, 0.96592171),
    ],
    [
        c(0.96508099, -1.40747202, 0.96508099, -1.40810535, 0.96443153),
        c(1.0, -1.45839783, 1.0, -1.45687509, 0.96573127),
    ],
];
static NOTCH_1000: [[BiquadCoeffs; 2]; 2] = [
    [
        c(0.98238544, -1.86875569, 0.98238544, -1.87946376, 0.98190767),
        c(1.0, -1.90226323, 1.0, -1.89126003, 0.98286346),
    ],
    [
        c(0.98238544, -1.82694201, 0.98238544, -1.83632723, 0.98199344),
        c(1.0, -1.85969981, 1.0, -1.85002606, 0.98277762),
    ],
];
static NOTCH_2000: [[BiquadCoeffs; 2]; 2] = [
    [
        c(0.99115360, -1.95794035, 0.99115360, -1.96501124, 0.99090637),
        c(1.0, -1.97541567, 1.0, -1.96826749, 0.99140088),
    ],
    [
        c(0.99115360, -1.94723352, 0.99115360, -1.95402567, 0.99094837),
        c(1.0, -1.96461328, 1.0, -1.95774425, 0.99135886),
    ],
];

fn exg_index(exg: ExgType) -> usize {
    match exg {
        ExgType::Ecg => 0,
        ExgType::Eog => 1,
        ExgType::Eeg => 2,
        ExgType::Emg => 3,
    }
}

fn notch_index(notch: NotchType) -> usize {
    match notch {
        NotchType::Hz50 => 0,
        NotchType::Hz60 => 1,
    }
}

/// Coefficients for a tabulated rate.
pub fn lookup(rate: SampleRate, kind: FilterKind) -> Option<CoeffSet> {
    let sections: &'static [BiquadCoeffs] = match (rate, kind) {
        (SampleRate::Hz250, FilterKind::Baseline) => &BASELINE_250,
        (SampleRate::Hz500, FilterKind::Baseline) => &BASELINE_500,
        (SampleRate::Hz1000, FilterKind::Baseline) => &BASELINE_1000,
        (SampleRate::Hz2000, FilterKind::Baseline) => &BASELINE_2000,
        (SampleRate::Hz250, FilterKind::Exg(exg)) => &EXG_250[exg_index(exg)],
        (SampleRate::Hz500, FilterKind::Exg(exg)) => &EXG_500[exg_index(exg)],
        (SampleRate::Hz1000, FilterKind::Exg(exg)) => &EXG_1000[exg_index(exg)],
        (SampleRate::Hz2000, FilterKind::Exg(exg)) => &EXG_2000[exg_index(exg)],
        (SampleRate::Hz250, FilterKind::Notch(n)) => &NOTCH_250[notch_index(n)],
        (SampleRate::Hz500, FilterKind::Notch(n)) => &NOTCH_500[notch_index(n)],
        (SampleRate::Hz1000, FilterKind::Notch(n)) => &NOTCH_1000[notch_index(n)],
        (SampleRate::Hz2000, FilterKind::Notch(n)) => &NOTCH_2000[notch_index(n)],
    };
    Some(CoeffSet { sections })
}

/// Coefficients for an arbitrary device rate; `None` means pass through.
pub fn lookup_hz(rate_hz: f32, kind: FilterKind) -> Option<CoeffSet> {
    SampleRate::from_hz(rate_hz).and_then(|rate| lookup(rate, kind))
}

/// Every tabulated (rate, filter) pair, for exhaustive checks.
pub fn all_kinds() -> impl Iterator<Item = (SampleRate, FilterKind)> {
    let kinds = std::iter::once(FilterKind::Baseline)
        .chain(ExgType::ALL.into_iter().map(FilterKind::Exg))
        .chain(NotchType::ALL.into_iter().map(FilterKind::Notch));
    let kinds: Vec<FilterKind> = kinds.collect();
    SampleRate::ALL
        .into_iter()
        .flat_map(move |rate| kinds.clone().into_iter().map(move |kind| (rate, kind)))
}
