use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "request.duration",
    metric_type: MetricType::Histogram,
    description: "Values request duration in seconds. Tagged with status.",
};

pub const REQUESTS_INFLIGHT: MetricDef = MetricDef {
    name: "requests.inflight",
    metric_type: MetricType::Gauge,
    description: "Number of requests currently being processed",
};

pub const UPSTREAM_ERRORS: MetricDef = MetricDef {
    name: "upstream.errors",
    metric_type: MetricType::Counter,
    description: "Failed calls to the Sheets API. Tagged with kind (network, upstream, malformed_response).",
};

pub const ALL_METRICS: &[MetricDef] = &[REQUEST_DURATION, REQUESTS_INFLIGHT, UPSTREAM_ERRORS];
