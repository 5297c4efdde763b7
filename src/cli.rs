//! `sit` command line: parses arguments and dispatches to [`crate::commands`].
//! Results are printed as JSON on stdout.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use crate::commands::reports::ReportPeriod;
use crate::commands::{self, Session};
use crate::db::setup::init_db;
use crate::error::AppError;
use crate::filter::{AuditFilter, QuickRange, SearchField, TicketFilter};
use crate::model::{NewTicket, NewUser, Priority, Role, Status};
use crate::state::AppState;

/// Labels typed on the command line must name a known value. The lenient
/// `From<String>` conversions are for stored documents only.
fn strict<T: FromStr<Err = String>>(s: &str) -> Result<T, String> {
    s.parse()
}

#[derive(Debug, Parser)]
#[command(name = "sit")]
#[command(about = "SIT - Sistema Inteligente de Tickets", long_about = None)]
pub struct Cli {
    /// SQLite database file
    #[arg(long, env = "SIT_DB", default_value = "sit.db", global = true)]
    pub db: PathBuf,

    /// Email of the acting user
    #[arg(long = "como", env = "SIT_USUARIO", default_value = "admin@hospital.hn", global = true)]
    pub como: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Import a JSON export of the platform collections
    Import { archivo: PathBuf },
    /// Ticket list and lifecycle
    Tickets {
        #[command(subcommand)]
        cmd: TicketsCmd,
    },
    /// Ticket conversations
    Chat {
        #[command(subcommand)]
        cmd: ChatCmd,
    },
    Departments {
        #[command(subcommand)]
        cmd: DepartmentsCmd,
    },
    Users {
        #[command(subcommand)]
        cmd: UsersCmd,
    },
    /// Bitácora
    Audit {
        #[command(subcommand)]
        cmd: AuditCmd,
    },
    Report {
        #[command(subcommand)]
        cmd: ReportCmd,
    },
    Config {
        #[command(subcommand)]
        cmd: ConfigCmd,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct PeriodArgs {
    /// First day (YYYY-MM-DD)
    #[arg(long)]
    pub desde: Option<NaiveDate>,
    /// Last day, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub hasta: Option<NaiveDate>,
    /// hoy, ayer, 7, 30, 90, mes, anio; overrides --desde/--hasta
    #[arg(long)]
    pub rango: Option<QuickRange>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    #[command(flatten)]
    pub periodo: PeriodArgs,
    #[arg(long)]
    pub texto: Option<String>,
    /// asunto, descripcion, departamento, categoria, tecnico, creadopor
    #[arg(long)]
    pub campo: Option<SearchField>,
    #[arg(long, value_parser = strict::<Status>)]
    pub estado: Option<Status>,
    #[arg(long, value_parser = strict::<Priority>)]
    pub prioridad: Option<Priority>,
    #[arg(long)]
    pub tecnico: Option<String>,
}

impl FilterArgs {
    fn to_filter(&self) -> TicketFilter {
        TicketFilter {
            date_start: self.periodo.desde,
            date_end: self.periodo.hasta,
            quick_range: self.periodo.rango,
            text: self.texto.clone(),
            field: self.campo,
            status: self.estado,
            priority: self.prioridad,
            assignee: self.tecnico.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum TicketsCmd {
    List {
        #[command(flatten)]
        filtro: FilterArgs,
        #[arg(long, default_value_t = 1)]
        pagina: usize,
        /// Write the filtered list to a PDF instead of printing a page
        #[arg(long)]
        exportar: Option<PathBuf>,
    },
    Show { ticket: String },
    Create {
        #[arg(long)]
        asunto: String,
        #[arg(long)]
        descripcion: String,
        #[arg(long)]
        departamento: String,
        #[arg(long, default_value = "")]
        categoria: String,
        #[arg(long, value_parser = strict::<Priority>)]
        prioridad: Option<Priority>,
    },
    Assign {
        ticket: String,
        #[arg(long)]
        tecnico: String,
        #[arg(long, value_parser = strict::<Priority>)]
        prioridad: Priority,
    },
    Reassign {
        ticket: String,
        #[arg(long)]
        tecnico: String,
    },
    /// pendiente | proceso
    Status {
        ticket: String,
        #[arg(value_parser = strict::<Status>)]
        estado: Status,
    },
    Close {
        ticket: String,
        #[arg(long)]
        solucion: String,
    },
    Delete { ticket: String },
    Recover { ticket: String },
    Purge { ticket: String },
    Comment { ticket: String, texto: String },
    /// Work-order PDF (ticket_<n>.pdf by default)
    Print {
        ticket: String,
        #[arg(long)]
        salida: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ChatCmd {
    Inbox,
    Send { ticket: String, texto: String },
    /// Show the conversation and mark it as read
    Read { ticket: String },
}

#[derive(Debug, Subcommand)]
pub enum DepartmentsCmd {
    List,
    Add { nombre: String },
    Remove { nombre: String },
}

#[derive(Debug, Clone, Args)]
pub struct UserArgs {
    #[arg(long)]
    pub nombre: String,
    #[arg(long)]
    pub dni: String,
    #[arg(long)]
    pub correo: String,
    #[arg(long)]
    pub departamento: String,
    /// Administrador, Tecnico, Usuario
    #[arg(long, default_value = "Usuario", value_parser = strict::<Role>)]
    pub rol: Role,
}

impl From<&UserArgs> for NewUser {
    fn from(a: &UserArgs) -> Self {
        NewUser {
            nombre: a.nombre.clone(),
            dni: a.dni.clone(),
            correo: a.correo.clone(),
            departamento: a.departamento.clone(),
            rol: a.rol,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum UsersCmd {
    List,
    Add {
        #[command(flatten)]
        datos: UserArgs,
    },
    Update {
        id: String,
        #[command(flatten)]
        datos: UserArgs,
    },
    Remove { id: String },
}

#[derive(Debug, Clone, Default, Args)]
pub struct AuditArgs {
    #[command(flatten)]
    pub periodo: PeriodArgs,
    #[arg(long)]
    pub usuario: Option<String>,
    /// Action prefix, e.g. "Eliminó"
    #[arg(long)]
    pub accion: Option<String>,
}

impl AuditArgs {
    fn to_filter(&self) -> AuditFilter {
        AuditFilter {
            date_start: self.periodo.desde,
            date_end: self.periodo.hasta,
            quick_range: self.periodo.rango,
            usuario: self.usuario.clone(),
            accion: self.accion.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum AuditCmd {
    List {
        #[command(flatten)]
        filtro: AuditArgs,
    },
    /// Users and action keywords present in the log
    Options,
    Export {
        #[command(flatten)]
        filtro: AuditArgs,
        #[arg(long, default_value = "bitacora.pdf")]
        salida: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
pub enum ReportCmd {
    /// Closed-ticket analytics for the current month unless a period is given;
    /// `--salida` ending in .xlsx writes a workbook
    Closed {
        #[command(flatten)]
        periodo: PeriodArgs,
        /// Every closed ticket, regardless of date
        #[arg(long, conflicts_with_all = ["desde", "hasta", "rango"])]
        todo: bool,
        #[arg(long)]
        salida: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCmd {
    Show,
    Set { clave: String, valor: String },
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn period(p: &PeriodArgs, todo: bool) -> ReportPeriod {
    ReportPeriod {
        date_start: p.desde,
        date_end: p.hasta,
        quick_range: p.rango,
        all_history: todo,
    }
}

fn open_state(db: &Path) -> Result<AppState, AppError> {
    if let Some(parent) = db.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let path = db
        .to_str()
        .ok_or_else(|| AppError::validation(format!("Ruta no válida: {}", db.display())))?;
    Ok(AppState::new(init_db(path)?))
}

pub fn run(cli: Cli) -> Result<(), AppError> {
    let state = open_state(&cli.db)?;
    let session = Session::resolve(&state, &cli.como)?;
    log::debug!("Sesión: {} ({})", session.correo, session.rol.label());
    dispatch(&state, &session, cli.command)
}

pub fn dispatch(state: &AppState, session: &Session, command: Command) -> Result<(), AppError> {
    use commands::{audit, chat, config, departments, import, reports, tickets, users};

    match command {
        Command::Import { archivo } => print_json(&import::import_json(state, session, &archivo)?),

        Command::Tickets { cmd } => match cmd {
            TicketsCmd::List { filtro, pagina, exportar } => match exportar {
                Some(out) => print_json(&tickets::export_ticket_list(state, session, &filtro.to_filter(), &out)?),
                None => print_json(&tickets::list_tickets(state, session, &filtro.to_filter(), pagina)?),
            },
            TicketsCmd::Show { ticket } => print_json(&tickets::get_ticket(state, session, &ticket)?),
            TicketsCmd::Create { asunto, descripcion, departamento, categoria, prioridad } => {
                let input = NewTicket {
                    asunto,
                    descripcion,
                    departamento,
                    categoria,
                    prioridad: prioridad.unwrap_or_default(),
                };
                print_json(&tickets::create_ticket(state, session, &input)?)
            }
            TicketsCmd::Assign { ticket, tecnico, prioridad } => {
                print_json(&tickets::assign_ticket(state, session, &ticket, &tecnico, prioridad)?)
            }
            TicketsCmd::Reassign { ticket, tecnico } => {
                print_json(&tickets::reassign_ticket(state, session, &ticket, &tecnico)?)
            }
            TicketsCmd::Status { ticket, estado } => {
                print_json(&tickets::change_status(state, session, &ticket, estado)?)
            }
            TicketsCmd::Close { ticket, solucion } => {
                print_json(&tickets::close_ticket(state, session, &ticket, &solucion)?)
            }
            TicketsCmd::Delete { ticket } => print_json(&tickets::delete_ticket(state, session, &ticket)?),
            TicketsCmd::Recover { ticket } => print_json(&tickets::recover_ticket(state, session, &ticket)?),
            TicketsCmd::Purge { ticket } => {
                tickets::purge_ticket(state, session, &ticket)?;
                println!("Ticket {} eliminado definitivamente", ticket);
                Ok(())
            }
            TicketsCmd::Comment { ticket, texto } => {
                print_json(&tickets::add_comment(state, session, &ticket, &texto)?)
            }
            TicketsCmd::Print { ticket, salida } => {
                let out = match salida {
                    Some(p) => p,
                    None => {
                        let t = commands::load_ticket(state, &ticket)?;
                        PathBuf::from(crate::export::ticket_detail::ticket_file_name(&t))
                    }
                };
                print_json(&tickets::print_ticket(state, session, &ticket, &out)?)
            }
        },

        Command::Chat { cmd } => match cmd {
            ChatCmd::Inbox => print_json(&chat::inbox(state, session)?),
            ChatCmd::Send { ticket, texto } => print_json(&chat::send_message(state, session, &ticket, &texto)?),
            ChatCmd::Read { ticket } => {
                let messages = chat::messages(state, session, &ticket)?;
                chat::mark_read(state, session, &ticket)?;
                print_json(&messages)
            }
        },

        Command::Departments { cmd } => match cmd {
            DepartmentsCmd::List => print_json(&departments::list_departments(state)?),
            DepartmentsCmd::Add { nombre } => print_json(&departments::add_department(state, session, &nombre)?),
            DepartmentsCmd::Remove { nombre } => {
                departments::remove_department(state, session, &nombre)?;
                println!("Departamento {} eliminado", nombre.trim());
                Ok(())
            }
        },

        Command::Users { cmd } => match cmd {
            UsersCmd::List => print_json(&users::list_users(state, session)?),
            UsersCmd::Add { datos } => print_json(&users::create_user(state, session, &NewUser::from(&datos))?),
            UsersCmd::Update { id, datos } => {
                print_json(&users::update_user(state, session, &id, &NewUser::from(&datos))?)
            }
            UsersCmd::Remove { id } => {
                users::delete_user(state, session, &id)?;
                println!("Usuario {} eliminado", id);
                Ok(())
            }
        },

        Command::Audit { cmd } => match cmd {
            AuditCmd::List { filtro } => print_json(&audit::list_audit(state, session, &filtro.to_filter())?),
            AuditCmd::Options => print_json(&audit::audit_filter_options(state, session)?),
            AuditCmd::Export { filtro, salida } => {
                print_json(&audit::export_audit(state, session, &filtro.to_filter(), &salida)?)
            }
        },

        Command::Report { cmd } => match cmd {
            ReportCmd::Closed { periodo, todo, salida } => {
                let periodo = period(&periodo, todo);
                match salida {
                    Some(out) => print_json(&reports::export_closed_report(state, session, &periodo, &out)?),
                    None => print_json(&reports::closed_report(state, session, &periodo)?),
                }
            }
        },

        Command::Config { cmd } => match cmd {
            ConfigCmd::Show => print_json(&config::get_config(state)?),
            ConfigCmd::Set { clave, valor } => print_json(&config::set_config(state, session, &clave, &valor)?),
        },
    }
}
