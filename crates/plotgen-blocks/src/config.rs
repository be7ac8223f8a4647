use serde::Deserialize;
use std::collections::HashMap;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct BlocksConfig {
    #[serde(default)]
    pub blocks: Vec<BlockDef>,
    #[serde(default)]
    pub biomes: Vec<String>,
    #[serde(default)]
    pub unknown_block: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BlockDef {
    pub name: String,
    #[serde(default)]
    pub id: Option<u16>,
    // property name -> allowed values; the first value is the default
    #[serde(default)]
    pub state_schema: Option<HashMap<String, Vec<String>>>,
}
