//! The sample metrics a run records: one counter increment and one gauge
//! reported through a callback.

use crate::config::SampleConfig;
use opentelemetry::{
    KeyValue,
    metrics::{Counter, Meter, ObservableGauge},
};
use tracing::info;

pub const COUNTER_DESCRIPTION: &str = "Processed jobs";
pub const GAUGE_DESCRIPTION: &str = "Sample value reported on every collection";

/// Instrument handles. The gauge callback stays registered while these are held.
pub struct SampleInstruments {
    pub counter: Counter<u64>,
    pub gauge: ObservableGauge<f64>,
}

pub fn record(meter: &Meter, config: &SampleConfig) -> SampleInstruments {
    let attributes = vec![KeyValue::new(
        "service.name",
        config.point_service_name.clone(),
    )];

    let counter = meter
        .u64_counter(config.counter_name.clone())
        .with_description(COUNTER_DESCRIPTION)
        .build();
    counter.add(config.counter_increment, &attributes);
    info!(
        counter = %config.counter_name,
        increment = config.counter_increment,
        "Counter incremented"
    );

    let value = config.gauge_value;
    let gauge = meter
        .f64_observable_gauge(config.gauge_name.clone())
        .with_description(GAUGE_DESCRIPTION)
        .with_callback(move |observer| observer.observe(value, &attributes))
        .build();
    info!(gauge = %config.gauge_name, value, "Gauge callback registered");

    SampleInstruments { counter, gauge }
}
