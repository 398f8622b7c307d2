//! System introspection for iai_core
//!
//! Gathers the GRASS environment (version, mapset, region, available maps)
//! through the module-invocation boundary, probes the PATH for GDAL and
//! shell tooling, and renders the assistant system prompt from the result.
//! Gathering is best-effort: outside a GRASS session every probe degrades
//! to an empty field with a warning, never an error.

use crate::host::ModuleRunner;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

const MAP_LIST_CAP: usize = 20;

/// One module family in the catalog
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModuleFamily {
    pub name: String,
    pub prefix: String,
    pub modules: Vec<String>,
}

/// Fixed catalog of GRASS modules, grouped by namespace family
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModuleCatalog {
    pub families: Vec<ModuleFamily>,
}

impl ModuleCatalog {
    pub fn total_modules(&self) -> usize {
        self.families.iter().map(|f| f.modules.len()).sum()
    }
}

impl Default for ModuleCatalog {
    fn default() -> Self {
        fn family(name: &str, prefix: &str, modules: &[&str]) -> ModuleFamily {
            ModuleFamily {
                name: name.to_string(),
                prefix: prefix.to_string(),
                modules: modules.iter().map(|m| m.to_string()).collect(),
            }
        }

        Self {
            families: vec![
                family(
                    "General",
                    "g",
                    &["g.list", "g.remove", "g.copy", "g.rename", "g.region", "g.proj", "g.gisenv"],
                ),
                family(
                    "Raster",
                    "r",
                    &[
                        "r.in.gdal", "r.out.gdal", "r.info", "r.stats", "r.univar", "r.mapcalc",
                        "r.slope.aspect", "r.watershed", "r.resample", "r.rescale", "r.colors",
                    ],
                ),
                family(
                    "Vector",
                    "v",
                    &[
                        "v.in.ogr", "v.out.ogr", "v.info", "v.db.select", "v.db.addcolumn",
                        "v.buffer", "v.overlay", "v.select", "v.centroid", "v.voronoi", "v.clean",
                    ],
                ),
                family(
                    "Imagery",
                    "i",
                    &[
                        "i.group", "i.target", "i.class", "i.cluster", "i.maxlik", "i.smap",
                        "i.vi", "i.tasscap", "i.pca", "i.fft", "i.ifft",
                    ],
                ),
                family(
                    "Database",
                    "db",
                    &[
                        "db.connect", "db.select", "db.execute", "db.tables", "db.columns",
                        "db.describe", "db.drivers", "db.login",
                    ],
                ),
                family(
                    "Temporal",
                    "t",
                    &[
                        "t.create", "t.register", "t.info", "t.list", "t.remove", "t.sample",
                        "t.rast.aggregate", "t.rast.extract", "t.vect.observe", "t.vect.what.strds",
                    ],
                ),
                family(
                    "Miscellaneous",
                    "m",
                    &["m.proj", "m.cogo", "m.transform", "m.measure"],
                ),
            ],
        }
    }
}

/// Computational region summary (g.region -g)
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RegionInfo {
    pub north: Option<String>,
    pub south: Option<String>,
    pub east: Option<String>,
    pub west: Option<String>,
    pub nsres: Option<String>,
    pub ewres: Option<String>,
    pub rows: Option<String>,
    pub cols: Option<String>,
}

/// Snapshot of the host environment the assistant runs in
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SystemContext {
    pub grass_version: Option<String>,
    pub database: Option<String>,
    pub location: Option<String>,
    pub mapset: Option<String>,
    pub region: Option<RegionInfo>,
    pub raster_maps: Vec<String>,
    pub vector_maps: Vec<String>,
    pub gdal_tools: Vec<String>,
    pub system_tools: Vec<String>,
}

impl SystemContext {
    /// Probe the environment through the module boundary and the PATH
    pub async fn gather(runner: &dyn ModuleRunner) -> Self {
        let mut ctx = Self::default();

        match runner.invoke("g.version", &flag_params("g")).await {
            Ok(text) => ctx.grass_version = parse_kv(&text).get("version").cloned(),
            Err(e) => warn!("could not read GRASS version: {:#}", e),
        }

        match runner.invoke("g.gisenv", &HashMap::new()).await {
            Ok(text) => {
                let kv = parse_kv(&text);
                ctx.database = kv.get("GISDBASE").cloned();
                ctx.location = kv.get("LOCATION_NAME").cloned();
                ctx.mapset = kv.get("MAPSET").cloned();
            }
            Err(e) => warn!("could not read GRASS environment: {:#}", e),
        }

        match runner.invoke("g.region", &flag_params("g")).await {
            Ok(text) => {
                let kv = parse_kv(&text);
                ctx.region = Some(RegionInfo {
                    north: kv.get("n").cloned(),
                    south: kv.get("s").cloned(),
                    east: kv.get("e").cloned(),
                    west: kv.get("w").cloned(),
                    nsres: kv.get("nsres").cloned(),
                    ewres: kv.get("ewres").cloned(),
                    rows: kv.get("rows").cloned(),
                    cols: kv.get("cols").cloned(),
                });
            }
            Err(e) => warn!("could not read region: {:#}", e),
        }

        ctx.raster_maps = list_maps(runner, "raster").await;
        ctx.vector_maps = list_maps(runner, "vector").await;
        ctx.gdal_tools = probe_tools(GDAL_TOOLS);
        ctx.system_tools = probe_tools(SYSTEM_TOOLS);
        ctx
    }
}

async fn list_maps(runner: &dyn ModuleRunner, map_type: &str) -> Vec<String> {
    let mut params = HashMap::new();
    params.insert("type".to_string(), map_type.to_string());
    match runner.invoke("g.list", &params).await {
        Ok(text) => text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .take(MAP_LIST_CAP)
            .map(String::from)
            .collect(),
        Err(e) => {
            warn!("could not list {} maps: {:#}", map_type, e);
            Vec::new()
        }
    }
}

fn flag_params(flags: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    params.insert("flags".to_string(), flags.to_string());
    params
}

/// Parse `key=value` lines (the -g output convention of GRASS modules)
pub fn parse_kv(text: &str) -> HashMap<String, String> {
    text.lines()
        .filter_map(|line| {
            line.trim()
                .split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        })
        .collect()
}

/// GDAL command-line tools probed for on the PATH
pub const GDAL_TOOLS: &[&str] = &[
    "gdalinfo",
    "gdal_translate",
    "gdalwarp",
    "gdalbuildvrt",
    "gdal_rasterize",
    "gdal_polygonize",
    "gdal_sieve",
    "gdal_fillnodata",
    "gdal_contour",
    "gdaldem",
    "gdal_grid",
    "gdal_merge",
    "gdaltransform",
    "gdaladdo",
    "ogrinfo",
    "ogr2ogr",
    "ogrmerge",
];

/// General-purpose tools probed for on the PATH
pub const SYSTEM_TOOLS: &[&str] = &[
    "wget", "curl", "unzip", "tar", "gzip", "awk", "sed", "grep", "cut", "sort", "uniq",
];

/// which-style PATH lookup
pub fn which(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path) {
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            return Some(candidate);
        }
    }
    None
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        path.metadata()
            .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

/// Filter a tool list down to what is actually installed
pub fn probe_tools(names: &[&str]) -> Vec<String> {
    names
        .iter()
        .filter(|n| which(n).is_some())
        .map(|n| n.to_string())
        .collect()
}

/// Render the assistant instruction block from the gathered environment
pub fn system_prompt(ctx: &SystemContext, catalog: &ModuleCatalog) -> String {
    let unknown = "unknown";
    let mut prompt = String::new();

    prompt.push_str("You are i.ai, an expert assistant for GRASS GIS and remote-sensing analysis.\n\n");
    prompt.push_str("ENVIRONMENT:\n");
    prompt.push_str(&format!(
        "- GRASS GIS version: {}\n- Database: {}\n- Location: {}\n- Mapset: {}\n",
        ctx.grass_version.as_deref().unwrap_or(unknown),
        ctx.database.as_deref().unwrap_or(unknown),
        ctx.location.as_deref().unwrap_or(unknown),
        ctx.mapset.as_deref().unwrap_or(unknown),
    ));

    prompt.push_str("\nCURRENT REGION:\n");
    match &ctx.region {
        Some(r) => prompt.push_str(&format!(
            "n={} s={} e={} w={} nsres={} ewres={} rows={} cols={}\n",
            r.north.as_deref().unwrap_or(unknown),
            r.south.as_deref().unwrap_or(unknown),
            r.east.as_deref().unwrap_or(unknown),
            r.west.as_deref().unwrap_or(unknown),
            r.nsres.as_deref().unwrap_or(unknown),
            r.ewres.as_deref().unwrap_or(unknown),
            r.rows.as_deref().unwrap_or(unknown),
            r.cols.as_deref().unwrap_or(unknown),
        )),
        None => prompt.push_str("region not available\n"),
    }

    prompt.push_str("\nAVAILABLE GRASS MODULES:\n");
    for family in &catalog.families {
        prompt.push_str(&format!(
            "{} ({}.*): {}\n",
            family.name,
            family.prefix,
            family.modules.join(", ")
        ));
    }

    prompt.push_str("\nAVAILABLE MAPS:\n");
    prompt.push_str(&format!("Raster: {}\n", ctx.raster_maps.join(", ")));
    prompt.push_str(&format!("Vector: {}\n", ctx.vector_maps.join(", ")));

    prompt.push_str(&format!("\nGDAL TOOLS:\n{}\n", ctx.gdal_tools.join(", ")));
    prompt.push_str(&format!("\nSYSTEM TOOLS:\n{}\n", ctx.system_tools.join(", ")));

    prompt.push_str(
        "\nRESPONSE GUIDELINES:\n\
         1. Provide specific, executable GRASS commands with correct syntax.\n\
         2. Include parameter values where appropriate.\n\
         3. Suggest GDAL tools for format conversion or preprocessing.\n\
         4. Recommend system tools for data download and preparation.\n\
         5. Consider the current region and available maps.\n\
         6. Provide step-by-step workflows for complex analyses.\n\
         \nCOMMAND SYNTAX EXAMPLES:\n\
         - GRASS: g.list type=raster\n\
         - GDAL: gdalinfo input.tif\n\
         - Shell: wget https://example.com/data.zip\n\
         \nBe practical and specific, using only the tools listed above.\n",
    );

    prompt
}
