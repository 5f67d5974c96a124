/// What the status labels show: the last position obtained and the last alert.
#[derive(Debug, Default, Clone)]
pub struct CurrentState {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub alert: Option<String>,
}
