//! GDS-II stream writer and reader.
//!
//! GDS-II is the binary mask format fabs consume. A stream is a sequence of
//! records, each `[2-byte length][2-byte record type][payload]`, nested as
//! BGNLIB → BGNSTR → BOUNDARY/PATH/SREF/TEXT → ENDSTR → ENDLIB.
//!
//! The writer emits one structure per library cell, children first. The
//! reader understands exactly the subset the writer produces.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use nanobeam_core::boolean::fracture;
use nanobeam_core::geometry::{BBox, GeomPrimitive, Path as LayoutPath, Point, Polygon, Rect};
use nanobeam_core::{Cell, CellInstance, Label, LayerId, Library, Transform};

// ── GDS-II Record Types ──────────────────────────────────────────────

mod record_type {
    pub const HEADER: u16 = 0x0002;
    pub const BGNLIB: u16 = 0x0102;
    pub const LIBNAME: u16 = 0x0206;
    pub const UNITS: u16 = 0x0305;
    pub const ENDLIB: u16 = 0x0400;
    pub const BGNSTR: u16 = 0x0502;
    pub const STRNAME: u16 = 0x0606;
    pub const ENDSTR: u16 = 0x0700;
    pub const BOUNDARY: u16 = 0x0800;
    pub const PATH: u16 = 0x0900;
    pub const SREF: u16 = 0x0A00;
    pub const AREF: u16 = 0x0B00;
    pub const TEXT: u16 = 0x0C00;
    pub const LAYER: u16 = 0x0D02;
    pub const DATATYPE: u16 = 0x0E02;
    pub const WIDTH: u16 = 0x0F03;
    pub const XY: u16 = 0x1003;
    pub const ENDEL: u16 = 0x1100;
    pub const SNAME: u16 = 0x1206;
    pub const NODE: u16 = 0x1500;
    pub const TEXTTYPE: u16 = 0x1602;
    pub const STRING: u16 = 0x1906;
    pub const STRANS: u16 = 0x1A01;
    pub const MAG: u16 = 0x1B05;
    pub const ANGLE: u16 = 0x1C05;
    pub const PATHTYPE: u16 = 0x2102;
    pub const BOX: u16 = 0x2D00;
}

/// STRANS bit marking a reflection about the x axis.
const STRANS_REFLECT: u16 = 0x8000;
/// A record length is a u16 that includes the 4-byte header.
const MAX_RECORD_PAYLOAD: usize = u16::MAX as usize - 4;

// ── Errors ────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum GdsError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid GDS-II record at offset {offset}: {message}")]
    InvalidRecord { offset: u64, message: String },

    #[error("Unexpected record type 0x{record_type:04X}, expected 0x{expected:04X}")]
    UnexpectedRecord { record_type: u16, expected: u16 },

    #[error("Coordinate {0} µm does not fit the database grid")]
    InvalidCoordinates(f64),

    #[error("Record 0x{record_type:04X} payload of {len} bytes exceeds the GDS-II limit")]
    RecordTooLong { record_type: u16, len: usize },

    #[error("Cell '{0}' referenced but not defined")]
    UndefinedCell(String),

    #[error("Cell '{0}' references itself")]
    RecursiveCell(String),

    #[error("Unsupported GDS-II construct: {0}")]
    Unsupported(String),
}

// ── Real numbers ─────────────────────────────────────────────────────

/// Convert GDS-II excess-64 real format to IEEE 754 f64.
fn gds_real8_to_f64(bytes: &[u8; 8]) -> f64 {
    if bytes.iter().all(|&b| b == 0) {
        return 0.0;
    }

    let sign = if bytes[0] & 0x80 != 0 { -1.0 } else { 1.0 };
    let exponent = (bytes[0] & 0x7F) as i32 - 64;

    let mut mantissa: u64 = 0;
    for &b in &bytes[1..] {
        mantissa = (mantissa << 8) | (b as u64);
    }

    let mantissa_f = mantissa as f64 / (1u64 << 56) as f64;
    sign * mantissa_f * 16.0_f64.powi(exponent)
}

/// Convert IEEE 754 f64 to GDS-II excess-64 real format.
fn f64_to_gds_real8(value: f64) -> [u8; 8] {
    if value == 0.0 {
        return [0u8; 8];
    }

    let sign_bit: u8 = if value < 0.0 { 0x80 } else { 0x00 };
    let mut val = value.abs();

    // 1/16 <= mantissa < 1
    let mut exponent: i32 = 0;
    while val >= 1.0 && exponent < 63 {
        val /= 16.0;
        exponent += 1;
    }
    while val < 1.0 / 16.0 && exponent > -64 {
        val *= 16.0;
        exponent -= 1;
    }

    let mut mantissa = (val * (1u64 << 56) as f64).round() as u64;
    if mantissa >= 1u64 << 56 {
        mantissa >>= 4;
        exponent += 1;
    }
    let exp_byte = sign_bit | ((exponent + 64) as u8 & 0x7F);

    let mut result = [0u8; 8];
    result[0] = exp_byte;
    result[1..].copy_from_slice(&mantissa.to_be_bytes()[1..]);
    result
}

// ── GDS-II Record ─────────────────────────────────────────────────────

#[derive(Debug)]
struct GdsRecord {
    record_type: u16,
    data: Vec<u8>,
}

impl GdsRecord {
    fn as_i16_vec(&self) -> Vec<i16> {
        self.data
            .chunks_exact(2)
            .map(|c| i16::from_be_bytes([c[0], c[1]]))
            .collect()
    }

    fn as_i32_vec(&self) -> Vec<i32> {
        self.data
            .chunks_exact(4)
            .map(|c| i32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    fn as_string(&self) -> String {
        let s: String = self.data.iter().map(|&b| b as char).collect();
        s.trim_end_matches('\0').to_string()
    }

    fn as_f64_vec(&self) -> Vec<f64> {
        self.data
            .chunks_exact(8)
            .map(|c| {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(c);
                gds_real8_to_f64(&bytes)
            })
            .collect()
    }

    fn first_i16(&self) -> Option<i16> {
        self.as_i16_vec().first().copied()
    }
}

// ── GDS-II Writer ─────────────────────────────────────────────────────

pub struct GdsWriter<W: Write> {
    writer: W,
    db_unit_in_um: Option<f64>,
    timestamp: [i16; 6],
}

impl<W: Write> GdsWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            db_unit_in_um: None,
            // fixed so identical layouts produce identical files
            timestamp: [2026, 1, 1, 0, 0, 0],
        }
    }

    /// Override the library's database unit.
    pub fn with_db_unit(mut self, db_unit_in_um: f64) -> Self {
        self.db_unit_in_um = Some(db_unit_in_um);
        self
    }

    /// Year, month, day, hour, minute, second stamped on the library and structures.
    pub fn with_timestamp(mut self, timestamp: [i16; 6]) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Write a library as a GDS-II stream.
    pub fn write(&mut self, lib: &Library) -> Result<(), GdsError> {
        let db_unit = self.db_unit_in_um.unwrap_or(lib.db_unit_um);

        self.write_i16_record(record_type::HEADER, &[600])?;
        self.write_i16_record(record_type::BGNLIB, &self.stamp())?;
        self.write_string_record(record_type::LIBNAME, &lib.name)?;
        // database unit in user units (µm), then in meters
        self.write_real8_record(record_type::UNITS, &[db_unit, db_unit * 1e-6])?;

        for cell in lib.all_cells() {
            self.write_cell(lib, cell, db_unit)?;
        }

        self.write_record(record_type::ENDLIB, &[])?;
        self.writer.flush()?;
        Ok(())
    }

    fn stamp(&self) -> [i16; 12] {
        let mut both = [0i16; 12];
        both[..6].copy_from_slice(&self.timestamp);
        both[6..].copy_from_slice(&self.timestamp);
        both
    }

    fn write_record(&mut self, record_type: u16, data: &[u8]) -> Result<(), GdsError> {
        if data.len() > MAX_RECORD_PAYLOAD {
            return Err(GdsError::RecordTooLong {
                record_type,
                len: data.len(),
            });
        }
        let total_len = (data.len() + 4) as u16;
        self.writer.write_all(&total_len.to_be_bytes())?;
        self.writer.write_all(&record_type.to_be_bytes())?;
        if !data.is_empty() {
            self.writer.write_all(data)?;
        }
        Ok(())
    }

    fn write_i16_record(&mut self, record_type: u16, values: &[i16]) -> Result<(), GdsError> {
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
        self.write_record(record_type, &data)
    }

    fn write_i32_record(&mut self, record_type: u16, values: &[i32]) -> Result<(), GdsError> {
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
        self.write_record(record_type, &data)
    }

    fn write_string_record(&mut self, record_type: u16, s: &str) -> Result<(), GdsError> {
        let mut data: Vec<u8> = s.bytes().collect();
        // GDS strings must be even length
        if data.len() % 2 != 0 {
            data.push(0);
        }
        self.write_record(record_type, &data)
    }

    fn write_real8_record(&mut self, record_type: u16, values: &[f64]) -> Result<(), GdsError> {
        let data: Vec<u8> = values
            .iter()
            .flat_map(|v| f64_to_gds_real8(*v))
            .collect();
        self.write_record(record_type, &data)
    }

    fn write_layer(&mut self, lib: &Library, layer_id: LayerId, type_record: u16) -> Result<(), GdsError> {
        let (layer, datatype) = lib.layer_stack.gds_spec(layer_id);
        self.write_i16_record(record_type::LAYER, &[layer as i16])?;
        self.write_i16_record(type_record, &[datatype as i16])
    }

    fn write_cell(&mut self, lib: &Library, cell: &Cell, db_unit: f64) -> Result<(), GdsError> {
        let name = lib
            .cell_name(&cell.id)
            .ok_or_else(|| GdsError::UndefinedCell(cell.name.clone()))?
            .to_string();
        log::debug!(
            "Writing structure '{}' ({} shapes, {} references)",
            name,
            cell.geometry_count(),
            cell.instance_count()
        );

        self.write_i16_record(record_type::BGNSTR, &self.stamp())?;
        self.write_string_record(record_type::STRNAME, &name)?;

        for geom in &cell.geometries {
            match geom {
                GeomPrimitive::Rect(rect) => {
                    self.write_boundary(lib, rect.layer_id, &rect.bbox().corners(), db_unit)?
                }
                GeomPrimitive::Polygon(poly) => {
                    for piece in fracture(poly) {
                        self.write_boundary(lib, piece.layer_id, &piece.vertices, db_unit)?;
                    }
                }
                GeomPrimitive::Path(path) => self.write_path(lib, path, db_unit)?,
            }
        }

        for inst in &cell.instances {
            self.write_sref(lib, inst, db_unit)?;
        }

        for label in &cell.labels {
            self.write_text(lib, label, db_unit)?;
        }

        self.write_record(record_type::ENDSTR, &[])?;
        Ok(())
    }

    fn write_boundary(
        &mut self,
        lib: &Library,
        layer_id: LayerId,
        vertices: &[Point],
        db_unit: f64,
    ) -> Result<(), GdsError> {
        if vertices.len() < 3 {
            return Ok(());
        }
        let mut coords = to_db_coords(vertices, db_unit)?;
        // close the ring
        coords.push(coords[0]);
        coords.push(coords[1]);

        self.write_record(record_type::BOUNDARY, &[])?;
        self.write_layer(lib, layer_id, record_type::DATATYPE)?;
        self.write_i32_record(record_type::XY, &coords)?;
        self.write_record(record_type::ENDEL, &[])
    }

    fn write_path(&mut self, lib: &Library, path: &LayoutPath, db_unit: f64) -> Result<(), GdsError> {
        self.write_record(record_type::PATH, &[])?;
        self.write_layer(lib, path.layer_id, record_type::DATATYPE)?;
        self.write_i16_record(record_type::PATHTYPE, &[0])?;
        self.write_i32_record(record_type::WIDTH, &[to_db(path.width, db_unit)?])?;
        self.write_i32_record(record_type::XY, &to_db_coords(&path.points, db_unit)?)?;
        self.write_record(record_type::ENDEL, &[])
    }

    fn write_sref(&mut self, lib: &Library, inst: &CellInstance, db_unit: f64) -> Result<(), GdsError> {
        let name = lib
            .cell_name(&inst.cell.id)
            .ok_or_else(|| GdsError::UndefinedCell(inst.cell.name.clone()))?
            .to_string();

        self.write_record(record_type::SREF, &[])?;
        self.write_string_record(record_type::SNAME, &name)?;

        if inst.transform.rotation != 0.0 {
            self.write_i16_record(record_type::STRANS, &[0])?;
            self.write_real8_record(record_type::ANGLE, &[inst.transform.rotation])?;
        }

        let offset = inst.transform.offset;
        self.write_i32_record(
            record_type::XY,
            &[to_db(offset.x, db_unit)?, to_db(offset.y, db_unit)?],
        )?;
        self.write_record(record_type::ENDEL, &[])
    }

    fn write_text(&mut self, lib: &Library, label: &Label, db_unit: f64) -> Result<(), GdsError> {
        self.write_record(record_type::TEXT, &[])?;
        self.write_layer(lib, label.layer_id, record_type::TEXTTYPE)?;
        self.write_i32_record(
            record_type::XY,
            &[to_db(label.position.x, db_unit)?, to_db(label.position.y, db_unit)?],
        )?;
        self.write_string_record(record_type::STRING, &label.text)?;
        self.write_record(record_type::ENDEL, &[])
    }
}

/// Snap a µm value onto the database grid.
fn to_db(value: f64, db_unit: f64) -> Result<i32, GdsError> {
    let scaled = (value / db_unit).round();
    if !scaled.is_finite() || scaled < i32::MIN as f64 || scaled > i32::MAX as f64 {
        return Err(GdsError::InvalidCoordinates(value));
    }
    Ok(scaled as i32)
}

fn to_db_coords(points: &[Point], db_unit: f64) -> Result<Vec<i32>, GdsError> {
    let mut coords = Vec::with_capacity(points.len() * 2);
    for p in points {
        coords.push(to_db(p.x, db_unit)?);
        coords.push(to_db(p.y, db_unit)?);
    }
    Ok(coords)
}

/// Write `lib` to a file at `path`.
pub fn write_gds_file(path: impl AsRef<Path>, lib: &Library) -> Result<(), GdsError> {
    let path = path.as_ref();
    let file = File::create(path)?;
    GdsWriter::new(BufWriter::new(file)).write(lib)?;
    log::info!(
        "Wrote {} structures of library '{}' to {}",
        lib.cell_count(),
        lib.name,
        path.display()
    );
    Ok(())
}

// ── GDS-II Reader ─────────────────────────────────────────────────────

/// A structure as it appears in the stream, before references are resolved.
#[derive(Debug, Default)]
struct RawStructure {
    name: String,
    geometries: Vec<GeomPrimitive>,
    references: Vec<(String, Transform)>,
    labels: Vec<Label>,
}

pub struct GdsReader<R: Read + Seek> {
    reader: R,
    db_unit_in_um: f64,
}

impl<R: Read + Seek> GdsReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            db_unit_in_um: 0.001, // Default: 1nm database unit
        }
    }

    /// Read the entire GDS-II stream into a Library.
    pub fn read(&mut self) -> Result<Library, GdsError> {
        let mut lib = Library::new("imported");

        self.read_header()?;
        let structures = self.read_lib(&mut lib)?;
        lib.db_unit_um = self.db_unit_in_um;
        resolve(&mut lib, structures)?;

        Ok(lib)
    }

    fn offset(&mut self) -> u64 {
        self.reader.seek(SeekFrom::Current(0)).unwrap_or(0)
    }

    fn read_record(&mut self) -> Result<Option<GdsRecord>, GdsError> {
        let mut len_buf = [0u8; 2];
        match self.reader.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(GdsError::Io(e)),
        }

        let total_len = u16::from_be_bytes(len_buf) as usize;
        if total_len < 4 {
            return Err(GdsError::InvalidRecord {
                offset: self.offset(),
                message: format!("Record length {} is too small", total_len),
            });
        }

        let mut type_buf = [0u8; 2];
        self.reader.read_exact(&mut type_buf)?;
        let record_type = u16::from_be_bytes(type_buf);

        let mut data = vec![0u8; total_len - 4];
        if !data.is_empty() {
            self.reader.read_exact(&mut data)?;
        }

        Ok(Some(GdsRecord { record_type, data }))
    }

    /// Next record inside an element or structure; running out is an error.
    fn expect_record(&mut self) -> Result<GdsRecord, GdsError> {
        match self.read_record()? {
            Some(rec) => Ok(rec),
            None => Err(GdsError::InvalidRecord {
                offset: self.offset(),
                message: "Stream ended inside a structure".into(),
            }),
        }
    }

    fn read_header(&mut self) -> Result<(), GdsError> {
        let rec = self.read_record()?.ok_or(GdsError::InvalidRecord {
            offset: 0,
            message: "Empty file".into(),
        })?;

        if rec.record_type != record_type::HEADER {
            return Err(GdsError::UnexpectedRecord {
                record_type: rec.record_type,
                expected: record_type::HEADER,
            });
        }

        if let Some(version) = rec.first_i16() {
            log::debug!("GDS-II version: {}", version);
        }
        Ok(())
    }

    fn read_lib(&mut self, lib: &mut Library) -> Result<Vec<RawStructure>, GdsError> {
        let mut structures = Vec::new();
        while let Some(rec) = self.read_record()? {
            match rec.record_type {
                record_type::LIBNAME => {
                    lib.name = rec.as_string();
                }
                record_type::UNITS => {
                    let units = rec.as_f64_vec();
                    if units.len() >= 2 {
                        self.db_unit_in_um = units[1] * 1e6; // meters to µm
                        log::debug!("Database unit: {} µm", self.db_unit_in_um);
                    }
                }
                record_type::BGNSTR => {
                    structures.push(self.read_structure(lib)?);
                }
                record_type::ENDLIB => break,
                _ => {}
            }
        }
        Ok(structures)
    }

    fn read_structure(&mut self, lib: &Library) -> Result<RawStructure, GdsError> {
        let mut raw = RawStructure::default();
        loop {
            let rec = self.expect_record()?;
            match rec.record_type {
                record_type::STRNAME => raw.name = rec.as_string(),
                record_type::BOUNDARY | record_type::BOX => {
                    if let Some(geom) = self.read_boundary(lib)? {
                        raw.geometries.push(geom);
                    }
                }
                record_type::PATH => {
                    if let Some(geom) = self.read_path(lib)? {
                        raw.geometries.push(geom);
                    }
                }
                record_type::SREF => raw.references.push(self.read_sref()?),
                record_type::TEXT => raw.labels.push(self.read_text(lib)?),
                record_type::AREF => {
                    return Err(GdsError::Unsupported(format!(
                        "array reference in '{}'",
                        raw.name
                    )))
                }
                record_type::NODE => self.skip_to_endel()?,
                record_type::ENDSTR => break,
                _ => {}
            }
        }
        Ok(raw)
    }

    fn layer_of(lib: &Library, layer: i16, datatype: i16) -> LayerId {
        lib.layer_stack
            .get_layer_by_gds(layer as u16, datatype as u16)
            .map(|l| l.id)
            .unwrap_or(layer as LayerId)
    }

    fn points(&self, rec: &GdsRecord) -> Vec<Point> {
        rec.as_i32_vec()
            .chunks_exact(2)
            .map(|pair| {
                Point::new(
                    pair[0] as f64 * self.db_unit_in_um,
                    pair[1] as f64 * self.db_unit_in_um,
                )
            })
            .collect()
    }

    fn read_boundary(&mut self, lib: &Library) -> Result<Option<GeomPrimitive>, GdsError> {
        let (mut layer, mut datatype) = (0i16, 0i16);
        let mut points: Vec<Point> = Vec::new();

        loop {
            let rec = self.expect_record()?;
            match rec.record_type {
                record_type::LAYER => layer = rec.first_i16().unwrap_or(0),
                record_type::DATATYPE => datatype = rec.first_i16().unwrap_or(0),
                record_type::XY => points = self.points(&rec),
                record_type::ENDEL => break,
                _ => {}
            }
        }

        // GDS boundaries repeat the first point; remove it
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        if points.len() < 3 {
            return Ok(None);
        }

        let layer_id = Self::layer_of(lib, layer, datatype);
        if points.len() == 4 && is_axis_aligned_rect(&points) {
            if let Some(bb) = BBox::from_points(&points) {
                return Ok(Some(GeomPrimitive::Rect(Rect::new(
                    layer_id, bb.min.x, bb.min.y, bb.max.x, bb.max.y,
                ))));
            }
        }
        Ok(Some(GeomPrimitive::Polygon(Polygon::new(layer_id, points))))
    }

    fn read_path(&mut self, lib: &Library) -> Result<Option<GeomPrimitive>, GdsError> {
        let (mut layer, mut datatype) = (0i16, 0i16);
        let mut width: f64 = 0.0;
        let mut points: Vec<Point> = Vec::new();

        loop {
            let rec = self.expect_record()?;
            match rec.record_type {
                record_type::LAYER => layer = rec.first_i16().unwrap_or(0),
                record_type::DATATYPE => datatype = rec.first_i16().unwrap_or(0),
                record_type::WIDTH => {
                    if let Some(w) = rec.as_i32_vec().first() {
                        width = *w as f64 * self.db_unit_in_um;
                    }
                }
                record_type::XY => points = self.points(&rec),
                record_type::ENDEL => break,
                _ => {}
            }
        }

        if points.is_empty() {
            return Ok(None);
        }
        Ok(Some(GeomPrimitive::Path(LayoutPath::new(
            Self::layer_of(lib, layer, datatype),
            points,
            width,
        ))))
    }

    fn read_sref(&mut self) -> Result<(String, Transform), GdsError> {
        let mut cell_name = String::new();
        let mut transform = Transform::default();

        loop {
            let rec = self.expect_record()?;
            match rec.record_type {
                record_type::SNAME => cell_name = rec.as_string(),
                record_type::STRANS => {
                    if let Some(bits) = rec.first_i16() {
                        if bits as u16 & STRANS_REFLECT != 0 {
                            return Err(GdsError::Unsupported(format!(
                                "reflected reference to '{}'",
                                cell_name
                            )));
                        }
                    }
                }
                record_type::MAG => {
                    if let Some(mag) = rec.as_f64_vec().first() {
                        if (mag - 1.0).abs() > 1e-12 {
                            return Err(GdsError::Unsupported(format!(
                                "magnified reference to '{}'",
                                cell_name
                            )));
                        }
                    }
                }
                record_type::ANGLE => {
                    if let Some(angle) = rec.as_f64_vec().first() {
                        transform.rotation = *angle;
                    }
                }
                record_type::XY => {
                    if let Some(p) = self.points(&rec).first() {
                        transform.offset = *p;
                    }
                }
                record_type::ENDEL => break,
                _ => {}
            }
        }
        Ok((cell_name, transform))
    }

    fn read_text(&mut self, lib: &Library) -> Result<Label, GdsError> {
        let (mut layer, mut texttype) = (0i16, 0i16);
        let mut position = Point::default();
        let mut text = String::new();

        loop {
            let rec = self.expect_record()?;
            match rec.record_type {
                record_type::LAYER => layer = rec.first_i16().unwrap_or(0),
                record_type::TEXTTYPE => texttype = rec.first_i16().unwrap_or(0),
                record_type::XY => {
                    if let Some(p) = self.points(&rec).first() {
                        position = *p;
                    }
                }
                record_type::STRING => text = rec.as_string(),
                record_type::ENDEL => break,
                _ => {}
            }
        }
        Ok(Label::new(&text, position, Self::layer_of(lib, layer, texttype)))
    }

    fn skip_to_endel(&mut self) -> Result<(), GdsError> {
        while self.expect_record()?.record_type != record_type::ENDEL {}
        Ok(())
    }
}

/// Build cells bottom-up so every reference points at a finished cell.
fn resolve(lib: &mut Library, structures: Vec<RawStructure>) -> Result<(), GdsError> {
    let by_name: HashMap<String, RawStructure> = structures
        .into_iter()
        .map(|s| (s.name.clone(), s))
        .collect();
    let referenced: HashSet<&str> = by_name
        .values()
        .flat_map(|s| s.references.iter().map(|(n, _)| n.as_str()))
        .collect();

    let mut names: Vec<&String> = by_name.keys().collect();
    names.sort();

    let mut built: HashMap<String, Arc<Cell>> = HashMap::new();
    let mut in_progress: HashSet<String> = HashSet::new();
    for name in &names {
        build(name, &by_name, &mut built, &mut in_progress, lib)?;
    }

    lib.top_cell = names
        .iter()
        .rev()
        .find(|n| !referenced.contains(n.as_str()))
        .and_then(|n| built.get(n.as_str()))
        .map(|c| c.id);
    log::info!("Read library '{}' with {} cells", lib.name, lib.cell_count());
    Ok(())
}

fn build(
    name: &str,
    by_name: &HashMap<String, RawStructure>,
    built: &mut HashMap<String, Arc<Cell>>,
    in_progress: &mut HashSet<String>,
    lib: &mut Library,
) -> Result<Arc<Cell>, GdsError> {
    if let Some(cell) = built.get(name) {
        return Ok(Arc::clone(cell));
    }
    let raw = by_name
        .get(name)
        .ok_or_else(|| GdsError::UndefinedCell(name.to_string()))?;
    if !in_progress.insert(name.to_string()) {
        return Err(GdsError::RecursiveCell(name.to_string()));
    }

    let mut cell = Cell::new(name);
    cell.geometries = raw.geometries.clone();
    cell.labels = raw.labels.clone();
    for (child_name, transform) in &raw.references {
        let child = build(child_name, by_name, built, in_progress, lib)?;
        cell.add_ref(&child).transform = *transform;
    }

    in_progress.remove(name);
    let cell = Arc::new(cell);
    lib.add_cell(Arc::clone(&cell));
    built.insert(name.to_string(), Arc::clone(&cell));
    Ok(cell)
}

/// Check if 4 points form an axis-aligned rectangle.
fn is_axis_aligned_rect(points: &[Point]) -> bool {
    if points.len() != 4 {
        return false;
    }
    let unique_x: HashSet<u64> = points.iter().map(|p| p.x.to_bits()).collect();
    let unique_y: HashSet<u64> = points.iter().map(|p| p.y.to_bits()).collect();
    unique_x.len() == 2 && unique_y.len() == 2
}

/// Read a GDS-II file from disk.
pub fn read_gds_file(path: impl AsRef<Path>) -> Result<Library, GdsError> {
    let file = File::open(path.as_ref())?;
    GdsReader::new(BufReader::new(file)).read()
}
