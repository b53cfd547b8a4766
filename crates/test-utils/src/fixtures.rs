//! Common test fixtures for geoserver-publish tests.

/// Ramp listing in the format printed by the raster store.
pub const RAMP_LISTING: &str = "\
bcyr: blue through cyan through yellow to red [range: map values]
greens: white to green [range: map values]
grey: grey scale [range: map values]
ndvi: Normalized Difference Vegetation Index colors [range: -1 to 1]
reds: white to red [range: map values]
";

/// Style document as generated from a color table, including the
/// unmapped-extremum row the generator emits.
pub const SAMPLE_SLD: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<StyledLayerDescriptor xmlns="http://www.opengis.net/sld" version="1.0.0">
  <NamedLayer>
    <Name>Default Styler</Name>
    <UserStyle>
      <FeatureTypeStyle>
        <Rule>
          <RasterSymbolizer>
            <ColorMap>
              <ColorMapEntry color="#ffffff" quantity="NaN" opacity="1"/>
              <ColorMapEntry color="#ffffff" quantity="1" opacity="1"/>
              <ColorMapEntry color="#00ff00" quantity="255" opacity="1"/>
            </ColorMap>
          </RasterSymbolizer>
        </Rule>
      </FeatureTypeStyle>
    </UserStyle>
  </NamedLayer>
</StyledLayerDescriptor>
"##;

/// Common workspace/connection values for tests.
pub mod geoserver {
    pub const WORKSPACE: &str = "test_ws";
    pub const USER: &str = "admin";
    pub const PASSWORD: &str = "geoserver";
}

/// Monthly land surface temperature sample (Kelvin * 50), three timesteps.
pub mod series {
    pub const NAME: &str = "LST_Day_monthly";

    pub const MAPS: [(&str, &str); 3] = [
        ("lst_2015_01", "2015-01-01 00:00:00"),
        ("lst_2015_02", "2015-02-01 00:00:00"),
        ("lst_2015_03", "2015-03-01 00:00:00"),
    ];

    /// Cell values of the n-th map; includes one no-data cell.
    pub fn cells(n: usize) -> Vec<Option<f64>> {
        let base = 13500.0 + n as f64 * 150.0;
        let mut cells: Vec<Option<f64>> = (0..100).map(|i| Some(base + i as f64 * 15.0)).collect();
        cells[50] = None;
        cells
    }
}
