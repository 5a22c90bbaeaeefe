use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct DailyCandles {
    pub s: String,
    #[serde(default)]
    pub c: Vec<f64>,
    #[serde(default)]
    pub t: Vec<u32>,
    pub errmsg: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IssuerProfile {
    pub s: String,
    #[serde(default)]
    pub name: Vec<String>,
    pub errmsg: Option<String>,
}
