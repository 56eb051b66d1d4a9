use std::fmt;
use std::sync::Arc;

use super::{Counter, Desc, Gauge, Histogram, MetricFamily, Summary};

/// Closed set of instrument kinds a registry can hold.
#[derive(Debug, Clone)]
pub enum Instrument {
    Counter(Counter),
    Gauge(Gauge),
    Histogram(Histogram),
    Summary(Summary),
}

impl Instrument {
    pub fn desc(&self) -> &Desc {
        match self {
            Instrument::Counter(c) => c.desc(),
            Instrument::Gauge(g) => g.desc(),
            Instrument::Histogram(h) => h.desc(),
            Instrument::Summary(s) => s.desc(),
        }
    }

    /// Read the current value of every child.
    pub fn collect(&self) -> MetricFamily {
        match self {
            Instrument::Counter(c) => c.family.collect(),
            Instrument::Gauge(g) => g.family.collect(),
            Instrument::Histogram(h) => h.family.collect(),
            Instrument::Summary(s) => s.family.collect(),
        }
    }

    /// Same kind, help, label schema, and kind-specific configuration.
    pub fn same_definition(&self, other: &Instrument) -> bool {
        match (self, other) {
            (Instrument::Counter(a), Instrument::Counter(b)) => a.desc() == b.desc(),
            (Instrument::Gauge(a), Instrument::Gauge(b)) => a.desc() == b.desc(),
            (Instrument::Histogram(a), Instrument::Histogram(b)) => {
                a.desc() == b.desc() && a.family.config() == b.family.config()
            }
            (Instrument::Summary(a), Instrument::Summary(b)) => {
                a.desc() == b.desc() && a.family.config() == b.family.config()
            }
            _ => false,
        }
    }

    /// True when both handles point at the same underlying instrument.
    pub fn same_instance(&self, other: &Instrument) -> bool {
        match (self, other) {
            (Instrument::Counter(a), Instrument::Counter(b)) => Arc::ptr_eq(&a.family, &b.family),
            (Instrument::Gauge(a), Instrument::Gauge(b)) => Arc::ptr_eq(&a.family, &b.family),
            (Instrument::Histogram(a), Instrument::Histogram(b)) => {
                Arc::ptr_eq(&a.family, &b.family)
            }
            (Instrument::Summary(a), Instrument::Summary(b)) => Arc::ptr_eq(&a.family, &b.family),
            _ => false,
        }
    }
}

/// Conversion between a typed handle and [`Instrument`], used by typed registration.
pub trait IntoInstrument: Sized {
    fn into_instrument(self) -> Instrument;
    fn from_instrument(inst: Instrument) -> Option<Self>;
}

macro_rules! into_instrument {
    ($ty:ident) => {
        impl IntoInstrument for $ty {
            fn into_instrument(self) -> Instrument {
                Instrument::$ty(self)
            }

            fn from_instrument(inst: Instrument) -> Option<Self> {
                match inst {
                    Instrument::$ty(v) => Some(v),
                    _ => None,
                }
            }
        }

        impl From<$ty> for Instrument {
            fn from(v: $ty) -> Self {
                Instrument::$ty(v)
            }
        }

        // Handles print their definition, not their values.
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($ty))
                    .field("desc", self.desc())
                    .finish()
            }
        }
    };
}

into_instrument!(Counter);
into_instrument!(Gauge);
into_instrument!(Histogram);
into_instrument!(Summary);

impl IntoInstrument for Instrument {
    fn into_instrument(self) -> Instrument {
        self
    }

    fn from_instrument(inst: Instrument) -> Option<Self> {
        Some(inst)
    }
}
