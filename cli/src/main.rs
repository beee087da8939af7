use clap::{Parser, Subcommand};
use cursus::domain::scholarship::{self, ScholarshipSpec};
use cursus::domain::{EngineContext, email::LogMailer, notify::InboxNotifier};
use cursus::model::entity::{
    Course, CourseCreate, DiscountType, Lesson, LessonCreate, Module, ModuleCreate, Program,
    ProgramCreate, UserEntity, UserEntityCreateUpdate,
};
use cursus::model::{CrudRepository, DatabaseError, DbConnection, ModelManager};
use cursus::web::{AuthenticatedUser, UserRole};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(about = "CLI tool for seeding the enrollment DB", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserCommands,
    },

    /// Manage programs
    Program {
        #[command(subcommand)]
        action: ProgramCommands,
    },

    /// Manage courses
    Course {
        #[command(subcommand)]
        action: CourseCommands,
    },

    /// Manage modules
    Module {
        #[command(subcommand)]
        action: ModuleCommands,
    },

    /// Manage lessons
    Lesson {
        #[command(subcommand)]
        action: LessonCommands,
    },

    /// Manage scholarship codes
    Scholarship {
        #[command(subcommand)]
        action: ScholarshipCommands,
    },
}

/// User management
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    Add {
        #[arg(long)]
        email: String,
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "student")]
        role: String,
    },
}

/// Program management
#[derive(Subcommand, Debug)]
pub enum ProgramCommands {
    Add {
        #[arg(long)]
        title: String,
        /// Price in minor units (cents)
        #[arg(long, default_value_t = 0)]
        price_cents: i64,
        #[arg(long, default_value = "USD")]
        currency: String,
        #[arg(long)]
        enrollment_limit: Option<i32>,
        #[arg(long, default_value_t = true)]
        published: bool,
    },
}

/// Course management
#[derive(Subcommand, Debug)]
pub enum CourseCommands {
    Add {
        /// Program title to attach the course to
        #[arg(long)]
        program_title: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value_t = 0)]
        minimum_quiz_score: i32,
        #[arg(long, default_value_t = 0)]
        required_projects: i32,
        #[arg(long, default_value_t = false)]
        capstone_required: bool,
        #[arg(long, default_value_t = 0)]
        estimated_hours: i32,
        #[arg(long, default_value_t = 0)]
        order_index: i32,
    },
}

/// Module management
#[derive(Subcommand, Debug)]
pub enum ModuleCommands {
    Add {
        /// Course title to attach the module to
        #[arg(long)]
        course_title: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value_t = 0)]
        order_index: i32,
    },
}

/// Lesson management
#[derive(Subcommand, Debug)]
pub enum LessonCommands {
    Add {
        /// Module title to attach the lesson to
        #[arg(long)]
        module_title: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value_t = 0)]
        order_index: i32,
    },
}

/// Scholarship management
#[derive(Subcommand, Debug)]
pub enum ScholarshipCommands {
    Generate {
        /// Program title the codes apply to
        #[arg(long)]
        program_title: String,
        #[arg(long, default_value = "SCHOLAR")]
        prefix: String,
        #[arg(long, default_value = "percentage")]
        discount_type: String,
        #[arg(long)]
        discount_value: i64,
        #[arg(long, default_value_t = 1)]
        quantity: i64,
    },
}

async fn id_by_title(mm: &ModelManager, table: &str, title: &str) -> cursus::error::AppResult<uuid::Uuid> {
    let query = format!("SELECT id FROM {table} WHERE title = $1");
    let id = sqlx::query_scalar(&query)
        .bind(title)
        .fetch_one(mm.executor())
        .await
        .map_err(DatabaseError::SqlxError)?;
    Ok(id)
}

#[tokio::main]
async fn main() -> cursus::error::AppResult<()> {
    let _ = dotenvy::dotenv();
    let args = Cli::parse();

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for the seeding CLI");
    let db_con = DbConnection::connect(&database_url)?;
    let mm = ModelManager::new(db_con);
    let actor = AuthenticatedUser::admin();

    match args.command {
        Commands::User { action } => match action {
            UserCommands::Add {
                email,
                full_name,
                password,
                role,
            } => {
                let user = UserEntity::create(
                    &mm,
                    &actor,
                    UserEntityCreateUpdate {
                        email,
                        full_name,
                        password_hash: cursus::auth::hash_password(&password)
                            .expect("unable to hash password"),
                        role: UserRole::from(role.as_str()),
                    },
                )
                .await?;
                println!("User created: {:?}", user);
            }
        },

        Commands::Program { action } => match action {
            ProgramCommands::Add {
                title,
                price_cents,
                currency,
                enrollment_limit,
                published,
            } => {
                let program = Program::create(
                    &mm,
                    &actor,
                    ProgramCreate {
                        title,
                        price_cents,
                        currency,
                        enrollment_limit,
                        is_published: published,
                    },
                )
                .await?;
                println!("Program created: {:?}", program);
            }
        },

        Commands::Course { action } => match action {
            CourseCommands::Add {
                program_title,
                title,
                minimum_quiz_score,
                required_projects,
                capstone_required,
                estimated_hours,
                order_index,
            } => {
                let program_id = id_by_title(&mm, "programs", &program_title).await?;

                let course = Course::create(
                    &mm,
                    &actor,
                    CourseCreate {
                        program_id,
                        title,
                        instructor_id: None,
                        minimum_quiz_score,
                        required_projects,
                        capstone_required,
                        estimated_hours,
                        order_index: Some(order_index),
                    },
                )
                .await?;
                println!("Course created: {:?}", course);
            }
        },

        Commands::Module { action } => match action {
            ModuleCommands::Add {
                course_title,
                title,
                order_index,
            } => {
                let course_id = id_by_title(&mm, "courses", &course_title).await?;

                let module = Module::create(
                    &mm,
                    &actor,
                    ModuleCreate {
                        course_id,
                        title,
                        order_index: Some(order_index),
                    },
                )
                .await?;
                println!("Module created: {:?}", module);
            }
        },

        Commands::Lesson { action } => match action {
            LessonCommands::Add {
                module_title,
                title,
                order_index,
            } => {
                let module_id = id_by_title(&mm, "modules", &module_title).await?;

                let lesson = Lesson::create(
                    &mm,
                    &actor,
                    LessonCreate {
                        module_id,
                        title,
                        order_index: Some(order_index),
                    },
                )
                .await?;
                println!("Lesson created: {:?}", lesson);
            }
        },

        Commands::Scholarship { action } => match action {
            ScholarshipCommands::Generate {
                program_title,
                prefix,
                discount_type,
                discount_value,
                quantity,
            } => {
                let program_id = id_by_title(&mm, "programs", &program_title).await?;

                let ctx = EngineContext::new(
                    mm.clone(),
                    Arc::new(InboxNotifier::new(mm.clone())),
                    Arc::new(LogMailer),
                );
                let spec = ScholarshipSpec {
                    program_id,
                    prefix,
                    student_email: None,
                    discount_type: DiscountType::from(discount_type.as_str()),
                    discount_value,
                    expires_at: None,
                };

                let codes = scholarship::bulk_generate(&ctx, &spec, quantity)
                    .await
                    .expect("scholarship generation failed");
                for code in &codes {
                    println!("{}", code.code());
                }
            }
        },
    }

    Ok(())
}
