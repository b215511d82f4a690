use std::io::{BufRead, Read};
use std::path::Path;

use super::{fan_triangulate, MeshIoError};
use crate::mesh::TriMesh;

#[derive(Debug, Clone, Copy, PartialEq)]
enum PlyFormat {
    Ascii,
    BinaryLittleEndian,
    BinaryBigEndian,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PlyDataType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float32,
    Float64,
}

impl PlyDataType {
    fn parse(type_str: &str) -> Result<Self, MeshIoError> {
        Ok(match type_str {
            "char" | "int8" => PlyDataType::Int8,
            "uchar" | "uint8" => PlyDataType::UInt8,
            "short" | "int16" => PlyDataType::Int16,
            "ushort" | "uint16" => PlyDataType::UInt16,
            "int" | "int32" => PlyDataType::Int32,
            "uint" | "uint32" => PlyDataType::UInt32,
            "float" | "float32" => PlyDataType::Float32,
            "double" | "float64" => PlyDataType::Float64,
            other => return Err(MeshIoError::malformed(format!("unknown type {other}"))),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PlyProperty {
    Scalar {
        name: String,
        data_type: PlyDataType,
    },
    List {
        name: String,
        count_type: PlyDataType,
        item_type: PlyDataType,
    },
}

impl PlyProperty {
    fn name(&self) -> &str {
        match self {
            PlyProperty::Scalar { name, .. } | PlyProperty::List { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone)]
struct PlyElement {
    name: String,
    count: usize,
    properties: Vec<PlyProperty>,
}

struct PlyHeader {
    format: PlyFormat,
    elements: Vec<PlyElement>,
}

fn parse_header<R: BufRead>(reader: &mut R) -> Result<PlyHeader, MeshIoError> {
    let mut line = String::new();
    let mut format = None;
    let mut elements: Vec<PlyElement> = Vec::new();

    reader.read_line(&mut line)?;
    if line.trim() != "ply" {
        return Err(MeshIoError::malformed("missing ply magic"));
    }

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(MeshIoError::malformed("missing end_header"));
        }
        let parts: Vec<&str> = line.split_whitespace().collect();

        match parts.as_slice() {
            ["end_header"] => break,
            ["format", fmt, ..] => {
                format = Some(match *fmt {
                    "ascii" => PlyFormat::Ascii,
                    "binary_little_endian" => PlyFormat::BinaryLittleEndian,
                    "binary_big_endian" => PlyFormat::BinaryBigEndian,
                    other => {
                        return Err(MeshIoError::malformed(format!("unknown format {other}")))
                    }
                });
            }
            ["element", name, count] => {
                let count = count
                    .parse()
                    .map_err(|_| MeshIoError::malformed(format!("invalid count {count}")))?;
                elements.push(PlyElement {
                    name: name.to_string(),
                    count,
                    properties: Vec::new(),
                });
            }
            ["property", "list", count_type, item_type, name] => {
                let element = elements
                    .last_mut()
                    .ok_or_else(|| MeshIoError::malformed("property before element"))?;
                element.properties.push(PlyProperty::List {
                    name: name.to_string(),
                    count_type: PlyDataType::parse(count_type)?,
                    item_type: PlyDataType::parse(item_type)?,
                });
            }
            ["property", data_type, name] => {
                let element = elements
                    .last_mut()
                    .ok_or_else(|| MeshIoError::malformed("property before element"))?;
                element.properties.push(PlyProperty::Scalar {
                    name: name.to_string(),
                    data_type: PlyDataType::parse(data_type)?,
                });
            }
            // comment, obj_info and blank lines
            _ => {}
        }
    }

    let format = format.ok_or_else(|| MeshIoError::malformed("missing format line"))?;
    Ok(PlyHeader { format, elements })
}

/// Source of typed property values, either ASCII tokens or binary words.
trait ValueReader {
    fn read_value(&mut self, data_type: PlyDataType) -> Result<f64, MeshIoError>;

    // ascii rows end at a newline, binary rows have no delimiter
    fn end_row(&mut self) -> Result<(), MeshIoError> {
        Ok(())
    }
}

struct AsciiReader<R> {
    reader: R,
    tokens: std::vec::IntoIter<String>,
}

impl<R: BufRead> AsciiReader<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            tokens: Vec::new().into_iter(),
        }
    }
}

impl<R: BufRead> ValueReader for AsciiReader<R> {
    fn read_value(&mut self, _data_type: PlyDataType) -> Result<f64, MeshIoError> {
        loop {
            if let Some(token) = self.tokens.next() {
                return token
                    .parse::<f64>()
                    .map_err(|_| MeshIoError::malformed(format!("invalid value {token}")));
            }
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Err(MeshIoError::malformed("unexpected end of ascii body"));
            }
            self.tokens = line
                .split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>()
                .into_iter();
        }
    }

    fn end_row(&mut self) -> Result<(), MeshIoError> {
        self.tokens = Vec::new().into_iter();
        Ok(())
    }
}

struct BinaryReader<R> {
    reader: R,
    big_endian: bool,
}

macro_rules! read_word {
    ($self:ident, $ty:ty) => {{
        let mut buf = [0u8; std::mem::size_of::<$ty>()];
        $self.reader.read_exact(&mut buf)?;
        if $self.big_endian {
            <$ty>::from_be_bytes(buf) as f64
        } else {
            <$ty>::from_le_bytes(buf) as f64
        }
    }};
}

impl<R: Read> ValueReader for BinaryReader<R> {
    fn read_value(&mut self, data_type: PlyDataType) -> Result<f64, MeshIoError> {
        Ok(match data_type {
            PlyDataType::Int8 => read_word!(self, i8),
            PlyDataType::UInt8 => read_word!(self, u8),
            PlyDataType::Int16 => read_word!(self, i16),
            PlyDataType::UInt16 => read_word!(self, u16),
            PlyDataType::Int32 => read_word!(self, i32),
            PlyDataType::UInt32 => read_word!(self, u32),
            PlyDataType::Float32 => read_word!(self, f32),
            PlyDataType::Float64 => read_word!(self, f64),
        })
    }
}

fn as_index(value: f64) -> Result<usize, MeshIoError> {
    if value < 0.0 || value.fract() != 0.0 {
        return Err(MeshIoError::malformed(format!("invalid face index {value}")));
    }
    Ok(value as usize)
}

fn read_body<V: ValueReader>(header: &PlyHeader, values: &mut V) -> Result<TriMesh, MeshIoError> {
    let mut vertices = Vec::new();
    let mut faces = Vec::new();
    let mut polygon = Vec::new();

    for element in &header.elements {
        let is_vertex = element.name == "vertex";
        let is_face = element.name == "face";

        let xyz_slots = ["x", "y", "z"].map(|axis| {
            element
                .properties
                .iter()
                .position(|p| matches!(p, PlyProperty::Scalar { .. }) && p.name() == axis)
        });
        if is_vertex && xyz_slots.iter().any(Option::is_none) {
            return Err(MeshIoError::malformed("vertex element without x, y, z"));
        }
        // rows without properties consume no input
        if element.properties.is_empty() {
            continue;
        }

        for _ in 0..element.count {
            let mut xyz = [0.0; 3];
            for (slot, property) in element.properties.iter().enumerate() {
                match property {
                    PlyProperty::Scalar { data_type, .. } => {
                        let value = values.read_value(*data_type)?;
                        if let Some(axis) = xyz_slots.iter().position(|s| *s == Some(slot)) {
                            xyz[axis] = value;
                        }
                    }
                    PlyProperty::List {
                        name,
                        count_type,
                        item_type,
                    } => {
                        let count = as_index(values.read_value(*count_type)?)?;
                        let is_indices =
                            is_face && (name == "vertex_indices" || name == "vertex_index");
                        polygon.clear();
                        for _ in 0..count {
                            let value = values.read_value(*item_type)?;
                            if is_indices {
                                polygon.push(as_index(value)?);
                            }
                        }
                        if is_indices {
                            if polygon.len() < 3 {
                                return Err(MeshIoError::malformed(format!(
                                    "face with {} vertices",
                                    polygon.len()
                                )));
                            }
                            fan_triangulate(&polygon, &mut faces);
                        }
                    }
                }
            }
            values.end_row()?;
            if is_vertex {
                vertices.push(xyz);
            }
        }
    }

    Ok(TriMesh::new(vertices, faces)?)
}

/// Parse a PLY stream into a triangle mesh.
///
/// Supports the `ascii`, `binary_little_endian` and `binary_big_endian`
/// encodings. Positions come from the `x`, `y`, `z` properties of the `vertex`
/// element and faces from the `vertex_indices` list of the `face` element. All
/// other elements and properties are skipped.
pub fn parse_ply<R: BufRead>(mut reader: R) -> Result<TriMesh, MeshIoError> {
    let header = parse_header(&mut reader)?;
    log::trace!(
        "PLY header: {:?}, elements {:?}",
        header.format,
        header
            .elements
            .iter()
            .map(|e| (&e.name, e.count))
            .collect::<Vec<_>>()
    );

    match header.format {
        PlyFormat::Ascii => read_body(&header, &mut AsciiReader::new(reader)),
        PlyFormat::BinaryLittleEndian | PlyFormat::BinaryBigEndian => {
            let mut values = BinaryReader {
                reader,
                big_endian: header.format == PlyFormat::BinaryBigEndian,
            };
            read_body(&header, &mut values)
        }
    }
}

/// Read a PLY file into a triangle mesh.
pub fn read_ply(path: impl AsRef<Path>) -> Result<TriMesh, MeshIoError> {
    let file = std::fs::File::open(path)?;
    parse_ply(std::io::BufReader::new(file))
}
