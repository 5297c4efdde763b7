use chrono::FixedOffset;
use rust_xlsxwriter::{ExcelDateTime, Workbook, XlsxError};

use super::closed_report::window_label;
use super::{
    create_datetime_format, create_header_format, create_integer_format, create_number_format,
    create_percent_format,
};
use crate::analyzer::ClosedReport;
use crate::error::AppError;
use crate::filter::to_local;

/// Closed-ticket analytics workbook, 3 sheets:
/// - "Resumen": period, totals, averages and status distribution
/// - "Por mes": monthly response and resolution averages
/// - "Tickets": one row per closed ticket
pub fn analytics_workbook(report: &ClosedReport, offset: &FixedOffset) -> Result<Vec<u8>, AppError> {
    let mut wb = Workbook::new();
    write_resumen(&mut wb, report)?;
    write_por_mes(&mut wb, report)?;
    write_tickets(&mut wb, report, offset)?;
    Ok(wb.save_to_buffer()?)
}

// ── Resumen ─────────────────────────────────────────────────────────────────

fn write_resumen(wb: &mut Workbook, report: &ClosedReport) -> Result<(), XlsxError> {
    let ws = wb.add_worksheet();
    ws.set_name("Resumen")?;

    let hdr = create_header_format();
    let int = create_integer_format();
    let num = create_number_format();
    let pct = create_percent_format();

    ws.write_with_format(0, 0, "Indicador", &hdr)?;
    ws.write_with_format(0, 1, "Valor", &hdr)?;

    ws.write(1, 0, "Periodo")?;
    ws.write(1, 1, window_label(report.window.as_ref()))?;
    ws.write(2, 0, "Tickets cerrados")?;
    ws.write_with_format(2, 1, report.total_cerrados as f64, &int)?;
    ws.write(3, 0, "Tickets en proceso")?;
    ws.write_with_format(3, 1, report.en_proceso as f64, &int)?;

    let averages = [
        ("Respuesta promedio (min)", report.promedio_respuesta_min),
        ("Resolución promedio (h)", report.promedio_resolucion_h),
        ("Mediana de resolución (h)", report.mediana_resolucion_h),
    ];
    for (i, (label, value)) in averages.iter().enumerate() {
        let row = 4 + i as u32;
        ws.write(row, 0, *label)?;
        match value {
            Some(v) => ws.write_with_format(row, 1, *v, &num)?,
            None => ws.write(row, 1, "N/A")?,
        };
    }

    // Distribución por estado
    let d = report.distribucion;
    let total = (d.pendiente + d.proceso + d.cerrado) as f64;
    ws.write_with_format(8, 0, "Estado", &hdr)?;
    ws.write_with_format(8, 1, "Tickets", &hdr)?;
    ws.write_with_format(8, 2, "Porcentaje", &hdr)?;
    for (i, (label, n)) in [("Pendiente", d.pendiente), ("En proceso", d.proceso), ("Cerrado", d.cerrado)]
        .iter()
        .enumerate()
    {
        let row = 9 + i as u32;
        ws.write(row, 0, *label)?;
        ws.write_with_format(row, 1, *n as f64, &int)?;
        let share = if total > 0.0 { *n as f64 / total } else { 0.0 };
        ws.write_with_format(row, 2, share, &pct)?;
    }

    // Cerrados por departamento
    let start = 13u32;
    ws.write_with_format(start, 0, "Departamento", &hdr)?;
    ws.write_with_format(start, 1, "Cerrados", &hdr)?;
    for (i, c) in report.por_departamento.iter().enumerate() {
        let row = start + 1 + i as u32;
        ws.write(row, 0, c.departamento.as_str())?;
        ws.write_with_format(row, 1, c.total as f64, &int)?;
    }

    ws.set_column_width(0, 30)?;
    ws.set_column_width(1, 24)?;
    ws.set_column_width(2, 12)?;
    Ok(())
}

// ── Por mes ─────────────────────────────────────────────────────────────────

fn write_por_mes(wb: &mut Workbook, report: &ClosedReport) -> Result<(), XlsxError> {
    let ws = wb.add_worksheet();
    ws.set_name("Por mes")?;

    let hdr = create_header_format();
    let num = create_number_format();
    let int = create_integer_format();

    let headers = ["Mes", "Indicador", "Promedio", "Muestras"];
    for (col, h) in headers.iter().enumerate() {
        ws.write_with_format(0, col as u16, *h, &hdr)?;
    }

    let series = report
        .respuesta_por_mes
        .iter()
        .map(|m| ("Respuesta (min)", m))
        .chain(report.resolucion_por_mes.iter().map(|m| ("Resolución (h)", m)));

    let mut row = 0u32;
    for (indicador, m) in series {
        row += 1;
        ws.write(row, 0, m.etiqueta.as_str())?;
        ws.write(row, 1, indicador)?;
        ws.write_with_format(row, 2, m.promedio, &num)?;
        ws.write_with_format(row, 3, m.muestras as f64, &int)?;
    }

    if row > 0 {
        ws.set_freeze_panes(1, 0)?;
        ws.autofilter(0, 0, row, (headers.len() - 1) as u16)?;
    }
    ws.set_column_width(0, 12)?;
    ws.set_column_width(1, 18)?;
    ws.set_column_width(2, 12)?;
    ws.set_column_width(3, 10)?;
    Ok(())
}

// ── Tickets ─────────────────────────────────────────────────────────────────

fn excel_datetime(dt: chrono::NaiveDateTime) -> Result<ExcelDateTime, XlsxError> {
    use chrono::{Datelike, Timelike};
    ExcelDateTime::from_ymd(dt.year() as u16, dt.month() as u8, dt.day() as u8)?.and_hms(
        dt.hour() as u16,
        dt.minute() as u8,
        dt.second() as f64,
    )
}

fn write_tickets(wb: &mut Workbook, report: &ClosedReport, offset: &FixedOffset) -> Result<(), XlsxError> {
    let ws = wb.add_worksheet();
    ws.set_name("Tickets")?;

    let hdr = create_header_format();
    let dt = create_datetime_format();

    let headers = [
        "ID",
        "Asunto",
        "Departamento",
        "Técnico",
        "Fecha Creación",
        "Fecha Cierre",
        "Tiempo Resolución",
    ];
    for (col, h) in headers.iter().enumerate() {
        ws.write_with_format(0, col as u16, *h, &hdr)?;
    }

    for (i, f) in report.filas.iter().enumerate() {
        let row = (i + 1) as u32;
        ws.write(row, 0, f.numero.as_str())?;
        ws.write(row, 1, f.asunto.as_str())?;
        ws.write(row, 2, f.departamento.as_str())?;
        ws.write(row, 3, f.tecnico.as_deref().unwrap_or("No asignado"))?;
        if let Some(c) = f.fecha_creacion {
            ws.write_with_format(row, 4, &excel_datetime(to_local(c, offset))?, &dt)?;
        }
        if let Some(c) = f.fecha_cierre {
            ws.write_with_format(row, 5, &excel_datetime(to_local(c, offset))?, &dt)?;
        }
        ws.write(row, 6, f.tiempo_resolucion.as_str())?;
    }

    if !report.filas.is_empty() {
        ws.set_freeze_panes(1, 0)?;
        ws.autofilter(0, 0, report.filas.len() as u32, (headers.len() - 1) as u16)?;
    }

    let widths = [8, 40, 20, 26, 20, 20, 16];
    for (col, w) in widths.iter().enumerate() {
        ws.set_column_width(col as u16, *w)?;
    }
    Ok(())
}
